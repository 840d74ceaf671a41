//! Trait and types for a race results provider.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::FantasyError;

/// Points scored by each driver in one round, keyed by ASCII full name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaceResults {
    pub season: u16,
    pub round: u32,
    pub race_name: Option<String>,
    pub points: HashMap<String, u32>,
}

impl RaceResults {
    pub fn new(season: u16, round: u32) -> Self {
        Self {
            season,
            round,
            ..Default::default()
        }
    }

    /// Records a driver's points. A repeated name replaces the earlier entry.
    pub fn insert(&mut self, driver: impl Into<String>, points: u32) {
        self.points.insert(driver.into(), points);
    }

    pub fn with_points<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        for (driver, points) in entries {
            self.insert(driver, points);
        }
        self
    }

    /// Points for `driver`, or `None` if they were not classified.
    pub fn points_for(&self, driver: &str) -> Option<u32> {
        self.points.get(driver).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drivers sorted by points, highest first, ties by name.
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        let mut ranked: Vec<_> = self.points.iter().map(|(d, p)| (d.as_str(), *p)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Abstraction over a results provider (e.g. the Ergast API).
#[async_trait::async_trait]
pub trait ResultsApi: Send + Sync {
    /// Returns the result set for `round` of the provider's season.
    async fn race_results(&self, round: u32) -> Result<RaceResults, FantasyError>;
}
