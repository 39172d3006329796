use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::registration::{RoleType, TechnicalLevel};

/// Headline numbers for the funnel dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelOverview {
    pub total_leads: usize,
    pub beta_testers: usize,
    pub masterclass_signups: usize,
    /// Beta testers as a percentage of leads, one decimal place.
    pub conversion_rate: f64,
    pub average_lead_score: Option<f64>,
    pub masterclass_by_role: Vec<BreakdownEntry>,
    pub masterclass_by_technical_level: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub value: String,
    pub label: String,
    pub count: usize,
}

pub fn conversion_rate(leads: usize, beta_testers: usize) -> f64 {
    if leads == 0 {
        return 0.0;
    }
    let percent = beta_testers as f64 / leads as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

pub fn summarize(leads: &[Value], beta_testers: &[Value], masterclass: &[Value]) -> FunnelOverview {
    let scores: Vec<f64> = masterclass
        .iter()
        .filter_map(|row| row.get("lead_score").and_then(Value::as_f64))
        .collect();
    let average_lead_score = if scores.is_empty() {
        None
    } else {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    let masterclass_by_role = RoleType::ordered()
        .into_iter()
        .map(|role| BreakdownEntry {
            value: wire_name(&role),
            label: role.label().to_string(),
            count: count_matching(masterclass, "role_type", &role),
        })
        .collect();

    let masterclass_by_technical_level = TechnicalLevel::ordered()
        .into_iter()
        .map(|level| BreakdownEntry {
            value: wire_name(&level),
            label: level.label().to_string(),
            count: count_matching(masterclass, "technical_level", &level),
        })
        .collect();

    FunnelOverview {
        total_leads: leads.len(),
        beta_testers: beta_testers.len(),
        masterclass_signups: masterclass.len(),
        conversion_rate: conversion_rate(leads.len(), beta_testers.len()),
        average_lead_score,
        masterclass_by_role,
        masterclass_by_technical_level,
    }
}

/// Keeps rows whose email or name contains `search`, ignoring case. Blank searches keep all.
pub fn filter_rows(rows: Vec<Value>, search: &str) -> Vec<Value> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| {
            ["email", "name", "full_name"].iter().any(|column| {
                row.get(*column)
                    .and_then(Value::as_str)
                    .is_some_and(|value| value.to_lowercase().contains(&needle))
            })
        })
        .collect()
}

fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => name,
        _ => String::new(),
    }
}

fn count_matching<T: Serialize>(rows: &[Value], column: &str, value: &T) -> usize {
    let Ok(expected) = serde_json::to_value(value) else {
        return 0;
    };
    rows.iter().filter(|row| row.get(column) == Some(&expected)).count()
}
