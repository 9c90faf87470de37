//! Terminal rendering of projects, messages, and analytics.

use colored::*;

use crate::analytics::Analytics;
use crate::models::{Message, ProjectSummary, Score};

/// How many top-rated responses the analytics view prints.
const TOP_RATED_SHOWN: usize = 5;
const PREVIEW_CHARS: usize = 120;

/// Five stars, filled up to the rating; `unrated` when there is none.
pub fn stars(score: Score) -> String {
    match score.rating() {
        None => "unrated".to_string(),
        Some(r) => {
            let filled = usize::from(r.value());
            format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
        }
    }
}

pub fn render_project_list(rows: &[&ProjectSummary], current: Option<&str>) -> String {
    if rows.is_empty() {
        return "No projects.".dimmed().to_string();
    }
    let mut out = String::new();
    for row in rows {
        let marker = if current == Some(row.id.as_str()) { "*" } else { " " };
        out.push_str(&format!(
            "{} {} {} ({} messages",
            marker,
            row.name.bold(),
            row.id.dimmed(),
            row.message_count
        ));
        if row.avg_rating > 0.0 {
            out.push_str(&format!(", ★ {:.1}", row.avg_rating));
        }
        out.push_str(&format!(", updated {})\n", row.last_updated.format("%Y-%m-%d %H:%M")));
    }
    out
}

pub fn render_message(message: &Message) -> String {
    let mut out = format!(
        "{} {}  {}\n",
        "Q:".bold(),
        message.user,
        format!("[{} {}]", message.id, message.timestamp.format("%H:%M:%S")).dimmed()
    );
    for r in &message.responses {
        out.push_str(&format!(
            "  {} {} {}\n    {}\n",
            r.model.cyan().bold(),
            r.id.dimmed(),
            stars(r.rating).yellow(),
            r.content
        ));
    }
    out
}

pub fn render_messages(messages: &[&Message], searching: bool) -> String {
    if messages.is_empty() {
        let hint = if searching {
            "No messages match the search."
        } else {
            "No messages yet. Send a question to get started."
        };
        return hint.dimmed().to_string();
    }
    messages.iter().map(|m| render_message(m)).collect::<Vec<_>>().join("\n")
}

pub fn render_analytics(a: &Analytics) -> String {
    let mut out = format!(
        "{} {}   {} {}   {} {:.1}\n\n",
        "Messages:".bold(),
        a.total_messages,
        "Responses:".bold(),
        a.total_responses,
        "Average rating:".bold(),
        a.average_rating()
    );

    out.push_str(&format!("{}\n", "Per model".underline()));
    for s in &a.model_stats {
        out.push_str(&format!(
            "  {:<12} {:>4} responses  ★ {:.1}  ({} points from {} ratings)\n",
            s.model.cyan(),
            s.count,
            s.avg_rating,
            s.total_rating,
            s.rated_count
        ));
    }

    out.push_str(&format!("\n{}\n", "Top rated".underline()));
    if a.top_rated_responses.is_empty() {
        out.push_str(&format!("  {}\n", "Nothing rated 4 or higher yet.".dimmed()));
    }
    for t in a.top_rated_responses.iter().take(TOP_RATED_SHOWN) {
        out.push_str(&format!(
            "  {} {}  {}\n    {}\n",
            t.model.cyan(),
            stars(Score::Rated(t.rating)).yellow(),
            t.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            preview(&t.content)
        ));
    }
    out
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::compute_analytics;
    use crate::models::{Project, Rating, Response};
    use chrono::Utc;

    #[test]
    fn test_stars() {
        assert_eq!(stars(Score::Unrated), "unrated");
        assert_eq!(stars(Score::Rated(Rating::new(3).unwrap())), "★★★☆☆");
        assert_eq!(stars(Score::Rated(Rating::new(5).unwrap())), "★★★★★");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_render_message_lists_every_model() {
        let m = Message {
            id: "m1".to_string(),
            user: "Test?".to_string(),
            responses: vec![
                Response::new("m1", 0, "GPT-4", "alpha".to_string()),
                Response::new("m1", 1, "Claude-3", "beta".to_string()),
            ],
            timestamp: Utc::now(),
        };
        let out = render_message(&m);
        assert!(out.contains("Test?"));
        assert!(out.contains("GPT-4"));
        assert!(out.contains("Claude-3"));
        assert!(out.contains("m1-1"));
        assert!(out.contains("beta"));
    }

    #[test]
    fn test_render_empty_views() {
        assert!(render_messages(&[], true).contains("No messages match"));
        assert!(render_messages(&[], false).contains("No messages yet"));
        assert!(render_project_list(&[], None).contains("No projects"));
    }

    #[test]
    fn test_render_project_list_marks_current() {
        let p = Project::new("p1", "Research");
        let row = crate::analytics::summarize_project(&p);
        let out = render_project_list(&[&row], Some("p1"));
        assert!(out.starts_with('*'));
        assert!(out.contains("Research"));
        assert!(out.contains("0 messages"));
    }

    #[test]
    fn test_render_analytics_header() {
        let a = compute_analytics(&[], &["GPT-4".to_string()]);
        let out = render_analytics(&a);
        assert!(out.contains("GPT-4"));
        assert!(out.contains("Nothing rated"));
    }
}
