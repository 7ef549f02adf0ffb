//! Message rendering.
//!
//! Every notification kind renders to a subject, a plain-text body and an
//! HTML body. Values from `metadata` are escaped before they reach HTML.
//! Missing metadata falls back to neutral placeholders (`Task`, `Project`,
//! `medium`) so a sparse record still produces a readable message.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use fpt_core::digest::{DigestRecipient, DigestWindow};
use fpt_core::enums::NotificationKind;
use fpt_core::notification::NotificationRecord;
use serde_json::Value;

use crate::transport::Email;

/// Notifications listed in the body of a digest email.
const DIGEST_LISTED: usize = 5;
/// Characters of a notification body quoted in a digest.
const DIGEST_EXCERPT: usize = 100;

#[derive(Debug, Clone)]
pub struct Renderer {
    app_url: String,
}

impl Renderer {
    #[must_use]
    pub fn new(app_url: &str) -> Self {
        Self {
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Render a stored notification for delivery to `to`.
    #[must_use]
    pub fn notification(&self, record: &NotificationRecord, to: &str) -> Email {
        let (subject, text, html) = match record.kind {
            NotificationKind::TaskDeadline => self.task_deadline(record),
            NotificationKind::BudgetAlert => self.budget_alert(record),
            NotificationKind::ProjectUpdate => self.project_update(record),
            NotificationKind::Digest | NotificationKind::Other => self.generic(record),
        };
        Email {
            to: to.to_string(),
            subject,
            text,
            html,
        }
    }

    /// Render a digest window for `recipient`.
    #[must_use]
    pub fn digest(&self, window: &DigestWindow, recipient: &DigestRecipient, to: &str) -> Email {
        let label = recipient.cadence.label();
        let name = recipient.name.as_deref().unwrap_or("User");
        let period = format!(
            "{} - {}",
            format_day(window.window_start),
            format_day(window.window_end)
        );
        let subject = format!("Your {label} Digest - Fire Protection Tracker");
        let listed = window.notifications.iter().take(DIGEST_LISTED);
        let remaining = window.notification_count.saturating_sub(DIGEST_LISTED);

        let mut text = format!(
            "Hello {name},\n\nHere's your {} summary for {period}.\n\n\
             Tasks completed: {}\nHours logged: {:.1}\nProjects updated: {}\nNotifications: {}\n",
            label.to_lowercase(),
            window.tasks_completed,
            window.hours_logged,
            window.projects_updated,
            window.notification_count,
        );
        let mut html = format!(
            "<p>Hello {},</p><p>Here's your {} summary of activity and notifications.</p>\
             <table class=\"stats\"><tr><td>{}</td><td>Tasks Completed</td></tr>\
             <tr><td>{:.1}</td><td>Hours Logged</td></tr>\
             <tr><td>{}</td><td>Projects Updated</td></tr>\
             <tr><td>{}</td><td>Notifications</td></tr></table>",
            escape(name),
            label.to_lowercase(),
            window.tasks_completed,
            window.hours_logged,
            window.projects_updated,
            window.notification_count,
        );

        if !window.notifications.is_empty() {
            text.push_str("\nNotifications:\n");
            html.push_str("<h2>Notifications</h2>");
            for notification in listed {
                let excerpt = excerpt(&notification.body);
                let _ = writeln!(text, "- {}: {excerpt}", notification.subject);
                let _ = write!(
                    html,
                    "<div class=\"item\"><p><strong>{}</strong></p><p>{}</p></div>",
                    escape(&notification.subject),
                    escape(&excerpt)
                );
            }
            if remaining > 0 {
                let _ = writeln!(text, "And {remaining} more notifications...");
                let _ = write!(html, "<p>And {remaining} more notifications...</p>");
            }
        }

        if !window.upcoming_deadlines.is_empty() {
            text.push_str("\nUpcoming deadlines:\n");
            html.push_str("<h2>Upcoming Deadlines</h2>");
            for task in &window.upcoming_deadlines {
                let priority = task.priority.as_deref().unwrap_or("medium");
                let due = format_day(task.due_date);
                let _ = writeln!(text, "- {} (due {due}, priority {priority})", task.name);
                let _ = write!(
                    html,
                    "<div class=\"item\"><p><strong>{}</strong></p><p>Due: {due} | Priority: {}</p></div>",
                    escape(&task.name),
                    escape(priority)
                );
            }
        }

        let link = format!("{}/dashboard", self.app_url);
        let _ = write!(text, "\nView dashboard: {link}\n");
        let _ = write!(html, "<p><a class=\"button\" href=\"{}\">View Dashboard</a></p>", escape(&link));

        Email {
            to: to.to_string(),
            subject,
            text,
            html: self.page(&format!("{label} Digest"), Some(&period), &html),
        }
    }

    fn task_deadline(&self, record: &NotificationRecord) -> (String, String, String) {
        let task = record.meta_text("task_name").unwrap_or_else(|| "Task".to_string());
        let project = record
            .meta_text("project_name")
            .unwrap_or_else(|| "Project".to_string());
        let due = record
            .meta_text("due_date")
            .map_or_else(|| "within 24 hours".to_string(), |raw| format_when(&raw));
        let priority = record
            .meta_text("priority")
            .unwrap_or_else(|| "medium".to_string());
        let subject = subject_or(record, || format!("Task due soon: {task}"));
        let link = format!("{}/tasks", self.app_url);

        let mut text = format!(
            "Task deadline reminder: {task} is due within 24 hours.\n\n\
             Project: {project}\nDue date: {due}\nPriority: {priority}\n"
        );
        if !record.body.is_empty() {
            let _ = write!(text, "\n{}\n", record.body);
        }
        let _ = write!(text, "\nView task: {link}\n");

        let mut inner = format!(
            "<div class=\"alert\"><strong>Attention Required:</strong> Your task is due within 24 hours.</div>\
             <h2>{}</h2>\
             <p><strong>Project:</strong> {}</p>\
             <p><strong>Due Date:</strong> {}</p>\
             <p><strong>Priority:</strong> <span class=\"priority-{}\">{}</span></p>",
            escape(&task),
            escape(&project),
            escape(&due),
            escape(&priority.to_lowercase()),
            escape(&priority),
        );
        if !record.body.is_empty() {
            let _ = write!(inner, "<h3>Description</h3><p>{}</p>", paragraphs(&record.body));
        }
        let _ = write!(inner, "<p><a class=\"button\" href=\"{}\">View Task</a></p>", escape(&link));

        (subject, text, self.page("Task Deadline Reminder", None, &inner))
    }

    fn budget_alert(&self, record: &NotificationRecord) -> (String, String, String) {
        let project = record
            .meta_text("project_name")
            .unwrap_or_else(|| "Project".to_string());
        let estimated = record.meta_number("estimated_budget").unwrap_or(0.0);
        let actual = record.meta_number("actual_cost").unwrap_or(0.0);
        let variance = record
            .meta_number("variance")
            .unwrap_or(actual - estimated);
        let percentage = record.meta_number("variance_percentage").unwrap_or_else(|| {
            if estimated > 0.0 {
                variance / estimated * 100.0
            } else {
                0.0
            }
        });
        let hours = record.meta_number("hours_spent").unwrap_or(0.0);
        let subject = subject_or(record, || format!("Budget alert: {project}"));
        let link = self.project_link(record);

        let text = format!(
            "{project} is over budget by {percentage:.1}%.\n\n\
             Estimated budget: {}\nActual cost: {}\nVariance: {}\nHours spent: {hours:.1}\n\n\
             View project: {link}\n",
            money(estimated),
            money(actual),
            money(variance),
        );
        let inner = format!(
            "<div class=\"urgent\"><h2>Project Over Budget</h2><p>{}</p></div>\
             <p class=\"metric\">+{percentage:.1}% over budget</p>\
             <p><strong>Estimated Budget:</strong> {}</p>\
             <p><strong>Actual Cost:</strong> {}</p>\
             <p><strong>Variance:</strong> {}</p>\
             <p><strong>Hours Spent:</strong> {hours:.1} hours</p>\
             <p><a class=\"button\" href=\"{}\">View Project Details</a></p>",
            escape(&project),
            money(estimated),
            money(actual),
            money(variance),
            escape(&link),
        );

        (subject, text, self.page("Budget Alert", None, &inner))
    }

    fn project_update(&self, record: &NotificationRecord) -> (String, String, String) {
        let project = record
            .meta_text("project_name")
            .unwrap_or_else(|| "Project".to_string());
        let title = record
            .meta_text("update_title")
            .unwrap_or_else(|| record.subject.clone());
        let message = record
            .meta_text("update_message")
            .unwrap_or_else(|| record.body.clone());
        let changes: Vec<String> = record
            .metadata
            .get("changes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let subject = subject_or(record, || format!("Project update: {project}"));
        let link = self.project_link(record);

        let mut text = format!("{project}\n\n{title}\n{message}\n");
        let mut inner = format!(
            "<h2>{}</h2><div class=\"update\"><h3>{}</h3><p>{}</p></div>",
            escape(&project),
            escape(&title),
            paragraphs(&message),
        );
        if !changes.is_empty() {
            text.push_str("\nWhat's changed:\n");
            inner.push_str("<h3>What's Changed</h3><ul>");
            for change in &changes {
                let _ = writeln!(text, "- {change}");
                let _ = write!(inner, "<li>{}</li>", escape(change));
            }
            inner.push_str("</ul>");
        }
        let _ = write!(text, "\nView project: {link}\n");
        let _ = write!(inner, "<p><a class=\"button\" href=\"{}\">View Project</a></p>", escape(&link));

        (subject, text, self.page("Project Update", None, &inner))
    }

    fn generic(&self, record: &NotificationRecord) -> (String, String, String) {
        let subject = subject_or(record, || "Fire Protection Tracker notification".to_string());
        let inner = format!("<p>{}</p>", paragraphs(&record.body));
        (
            subject.clone(),
            record.body.clone(),
            self.page(&subject, None, &inner),
        )
    }

    fn project_link(&self, record: &NotificationRecord) -> String {
        let id = record
            .related_entity_id
            .clone()
            .or_else(|| record.meta_text("project_id"))
            .unwrap_or_default();
        format!("{}/projects/{id}", self.app_url)
    }

    fn page(&self, title: &str, subtitle: Option<&str>, inner: &str) -> String {
        let subtitle = subtitle
            .map(|s| format!("<p class=\"subtitle\">{}</p>", escape(s)))
            .unwrap_or_default();
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><div class=\"container\"><div class=\"header\"><h1>{title}</h1>{subtitle}</div>\
             <div class=\"content\">{inner}</div>\
             <div class=\"footer\"><p>Fire Protection Tracker</p>\
             <p><a href=\"{prefs}\">Manage notification preferences</a></p></div></div></body></html>",
            title = escape(title),
            prefs = escape(&format!("{}/settings/notifications", self.app_url)),
        )
    }
}

fn subject_or(record: &NotificationRecord, fallback: impl FnOnce() -> String) -> String {
    if record.subject.is_empty() {
        fallback()
    } else {
        record.subject.clone()
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escaped text with line breaks kept.
fn paragraphs(raw: &str) -> String {
    escape(raw).replace('\n', "<br>")
}

fn excerpt(body: &str) -> String {
    if body.chars().count() > DIGEST_EXCERPT {
        let head: String = body.chars().take(DIGEST_EXCERPT).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

fn format_day(at: DateTime<Utc>) -> String {
    at.format("%-d %b %Y").to_string()
}

/// RFC 3339 timestamps become `17 Oct 2026 14:00 UTC`; anything else is shown as is.
fn format_when(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |at| at.with_timezone(&Utc).format("%-d %b %Y %H:%M UTC").to_string(),
    )
}

/// Rand amount with thousands separators: `R 12,345` or `R 12,345.50`.
fn money(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if cents == "00" {
        format!("{sign}R {grouped}")
    } else {
        format!("{sign}R {grouped}.{cents}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fpt_core::digest::UpcomingDeadline;
    use fpt_core::enums::DigestCadence;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: Value) -> NotificationRecord {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case(0.0, "R 0")]
    #[case(950.0, "R 950")]
    #[case(12_345.0, "R 12,345")]
    #[case(1_234_567.5, "R 1,234,567.50")]
    #[case(-2_500.0, "-R 2,500")]
    fn money_groups_thousands(#[case] amount: f64, #[case] expected: &str) {
        assert_eq!(money(amount), expected);
    }

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(
            escape("<script>\"x\" & 'y'</script>"),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn task_deadline_uses_metadata_and_escapes_html() {
        let renderer = Renderer::new("https://app.example/");
        let email = renderer.notification(
            &record(json!({
                "id": "n-1",
                "notification_type": "task_deadline",
                "subject": "Task due soon: Pump test",
                "body": "Check <valve> pressure",
                "metadata": {
                    "task_name": "Pump test",
                    "project_name": "Hospital Wing",
                    "due_date": "2026-10-18T14:00:00Z",
                    "priority": "High"
                }
            })),
            "tech@example.com",
        );

        assert_eq!(email.to, "tech@example.com");
        assert_eq!(email.subject, "Task due soon: Pump test");
        assert!(email.text.contains("Project: Hospital Wing"));
        assert!(email.text.contains("Due date: 18 Oct 2026 14:00 UTC"));
        assert!(email.text.contains("Check <valve> pressure"));
        assert!(email.html.contains("Check &lt;valve&gt; pressure"));
        assert!(email.html.contains("priority-high"));
        assert!(email.html.contains("https://app.example/tasks"));
    }

    #[test]
    fn task_deadline_falls_back_on_sparse_metadata() {
        let email = Renderer::new("https://app.example").notification(
            &record(json!({"id": "n-2", "notification_type": "task_deadline"})),
            "a@example.com",
        );
        assert_eq!(email.subject, "Task due soon: Task");
        assert!(email.text.contains("Project: Project"));
        assert!(email.text.contains("Priority: medium"));
    }

    #[test]
    fn budget_alert_derives_variance() {
        let email = Renderer::new("https://app.example").notification(
            &record(json!({
                "id": "n-3",
                "notification_type": "budget_alert",
                "related_entity_id": "p-7",
                "metadata": {
                    "project_name": "Mall Sprinklers",
                    "estimated_budget": 100_000,
                    "actual_cost": 125_000
                }
            })),
            "pm@example.com",
        );
        assert_eq!(email.subject, "Budget alert: Mall Sprinklers");
        assert!(email.text.contains("over budget by 25.0%"));
        assert!(email.text.contains("Variance: R 25,000"));
        assert!(email.html.contains("https://app.example/projects/p-7"));
    }

    #[test]
    fn project_update_lists_changes() {
        let email = Renderer::new("https://app.example").notification(
            &record(json!({
                "id": "n-4",
                "notification_type": "project_update",
                "subject": "Scope changed",
                "body": "Two more floors",
                "metadata": {"project_name": "Tower", "changes": ["Floor 9", "Floor 10"]}
            })),
            "pm@example.com",
        );
        assert!(email.text.contains("- Floor 9\n- Floor 10\n"));
        assert!(email.html.contains("<li>Floor 10</li>"));
    }

    #[test]
    fn generic_keeps_line_breaks() {
        let email = Renderer::new("https://app.example").notification(
            &record(json!({
                "id": "n-5",
                "notification_type": "system_alert",
                "subject": "Maintenance",
                "body": "Tonight\nat 22:00"
            })),
            "ops@example.com",
        );
        assert_eq!(email.text, "Tonight\nat 22:00");
        assert!(email.html.contains("Tonight<br>at 22:00"));
    }

    #[test]
    fn digest_lists_five_and_counts_the_rest() {
        let end = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let notifications = (0..7)
            .map(|i| {
                record(json!({
                    "id": format!("n-{i}"),
                    "notification_type": "task_deadline",
                    "subject": format!("Notice {i}"),
                    "body": "x".repeat(150),
                    "status": "sent"
                }))
            })
            .collect();
        let window = DigestWindow {
            user_id: "u-1".into(),
            window_start: end - chrono::Duration::days(7),
            window_end: end,
            notification_count: 7,
            notifications,
            tasks_completed: 3,
            hours_logged: 12.34,
            projects_updated: 1,
            upcoming_deadlines: vec![UpcomingDeadline {
                task_id: "t-1".into(),
                name: "Hydrant flush".into(),
                due_date: end + chrono::Duration::days(2),
                priority: Some("high".into()),
            }],
        };
        let recipient = DigestRecipient {
            user_id: "u-1".into(),
            email: Some("pm@example.com".into()),
            name: Some("Thandi".into()),
            cadence: DigestCadence::Weekly,
        };

        let email = Renderer::new("https://app.example").digest(&window, &recipient, "pm@example.com");

        assert_eq!(email.subject, "Your Weekly Digest - Fire Protection Tracker");
        assert!(email.text.starts_with("Hello Thandi,"));
        assert!(email.text.contains("12 Oct 2026 - 19 Oct 2026"));
        assert!(email.text.contains("Hours logged: 12.3"));
        assert_eq!(email.text.matches("- Notice").count(), 5);
        assert!(email.text.contains(&format!("{}...", "x".repeat(100))));
        assert!(email.text.contains("And 2 more notifications..."));
        assert!(email.text.contains("- Hydrant flush (due 21 Oct 2026, priority high)"));
    }
}
