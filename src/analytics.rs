use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Project, ProjectSummary, Rating};

/// How many entries `top_rated_responses` keeps.
pub const TOP_RATED_LIMIT: usize = 10;
/// Lowest rating that counts as "top rated".
pub const TOP_RATED_MIN: u8 = 4;

/// Per-model aggregate over every project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    pub model: String,
    /// Responses from this model, rated or not.
    pub count: usize,
    pub rated_count: usize,
    pub total_rating: u64,
    /// `total_rating / rated_count`, or 0 when nothing is rated.
    pub avg_rating: f64,
}

/// A highly rated response, flattened for the analytics view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRatedResponse {
    pub model: String,
    pub rating: Rating,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_messages: usize,
    pub total_responses: usize,
    pub model_stats: Vec<ModelStats>,
    pub top_rated_responses: Vec<TopRatedResponse>,
}

impl Analytics {
    /// Mean of the per-model averages shown in the summary header.
    ///
    /// Unrated models contribute 0, matching what the per-model rows display.
    pub fn average_rating(&self) -> f64 {
        if self.model_stats.is_empty() {
            return 0.0;
        }
        self.model_stats.iter().map(|s| s.avg_rating).sum::<f64>() / self.model_stats.len() as f64
    }
}

/// Recompute every aggregate from scratch.
///
/// `models` fixes the rows of `model_stats` and their order; responses from
/// models outside that list still count toward the totals and top-rated list.
pub fn compute_analytics(projects: &[Project], models: &[String]) -> Analytics {
    let total_messages = projects.iter().map(|p| p.messages.len()).sum();
    let total_responses = projects.iter().flat_map(Project::responses).count();

    let model_stats = models
        .iter()
        .map(|model| {
            let mut stats = ModelStats {
                model: model.clone(),
                count: 0,
                rated_count: 0,
                total_rating: 0,
                avg_rating: 0.0,
            };
            for r in projects.iter().flat_map(Project::responses).filter(|r| &r.model == model) {
                stats.count += 1;
                if let Some(rating) = r.rating.rating() {
                    stats.rated_count += 1;
                    stats.total_rating += u64::from(rating.value());
                }
            }
            if stats.rated_count > 0 {
                stats.avg_rating = stats.total_rating as f64 / stats.rated_count as f64;
            }
            stats
        })
        .collect();

    let mut top_rated_responses: Vec<TopRatedResponse> = projects
        .iter()
        .flat_map(Project::responses)
        .filter_map(|r| {
            let rating = r.rating.rating().filter(|rt| rt.value() >= TOP_RATED_MIN)?;
            Some(TopRatedResponse {
                model: r.model.clone(),
                rating,
                content: r.content.clone(),
                timestamp: r.timestamp,
            })
        })
        .collect();
    // sort_by is stable: ties keep encounter order.
    top_rated_responses.sort_by(|a, b| b.rating.cmp(&a.rating));
    top_rated_responses.truncate(TOP_RATED_LIMIT);

    Analytics {
        total_messages,
        total_responses,
        model_stats,
        top_rated_responses,
    }
}

/// Sidebar summary: message count and mean rating over rated responses.
pub fn summarize_project(project: &Project) -> ProjectSummary {
    let ratings: Vec<u8> = project
        .responses()
        .filter_map(|r| r.rating.rating())
        .map(Rating::value)
        .collect();
    let avg_rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().map(|&v| f64::from(v)).sum::<f64>() / ratings.len() as f64
    };
    ProjectSummary {
        id: project.id.clone(),
        name: project.name.clone(),
        message_count: project.messages.len(),
        avg_rating,
        last_updated: project.last_updated,
    }
}
