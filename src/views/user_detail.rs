use serde::Serialize;

use crate::models::{FundingPlan, UserRecord, UserStatus};

/// Placeholder for blank survey answers
pub const NOT_SPECIFIED: &str = "Not specified";

/// Detail modal for a single record.
///
/// Read-only except for the status selector, which hands the change to a
/// caller-supplied callback; persistence is the list view's job.
#[derive(Debug, Clone, Default)]
pub struct UserDetailView {
    record: Option<UserRecord>,
    visible: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub status: UserStatus,
    pub status_variant: String,
    pub status_options: Vec<StatusOption>,
    pub joined: String,
    pub sections: Vec<DetailSection>,
    pub funding_plan: FundingPlan,
    pub funding_plan_warning: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StatusOption {
    pub value: UserStatus,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DetailSection {
    pub title: String,
    pub fields: Vec<DetailField>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DetailField {
    pub label: String,
    pub value: String,
    pub specified: bool,
}

impl UserDetailView {
    pub fn new(record: Option<UserRecord>, visible: bool) -> Self {
        Self { record, visible }
    }

    pub fn open(record: UserRecord) -> Self {
        Self::new(Some(record), true)
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.record = None;
    }

    pub fn is_open(&self) -> bool {
        self.visible && self.record.is_some()
    }

    pub fn record(&self) -> Option<&UserRecord> {
        self.record.as_ref().filter(|_| self.visible)
    }

    /// `None` when there is nothing to show
    pub fn render(&self) -> Option<UserDetail> {
        self.record().map(render_detail)
    }

    /// Forwards a selector change to `on_change(id, status)`. Re-selecting the
    /// current status is not a change and does not invoke the callback.
    pub fn select_status<F, R>(&self, status: UserStatus, on_change: F) -> Option<R>
    where
        F: FnOnce(&str, UserStatus) -> R,
    {
        let record = self.record()?;
        if record.status == status {
            return None;
        }
        Some(on_change(&record.id, status))
    }

    /// Picks up a confirmed update for the record currently on display
    pub fn reconcile(&mut self, updated: &UserRecord) {
        if let Some(record) = self.record.as_mut() {
            if record.id == updated.id {
                *record = updated.clone();
            }
        }
    }
}

fn render_detail(user: &UserRecord) -> UserDetail {
    let funding_plan = user.funding_plan();

    UserDetail {
        id: user.id.clone(),
        display_name: user.display_name.clone(),
        email: user.email.clone(),
        status: user.status,
        status_variant: user.status.badge_variant().to_string(),
        status_options: UserStatus::ALL
            .iter()
            .map(|&value| StatusOption {
                value,
                label: value.label().to_string(),
                selected: value == user.status,
            })
            .collect(),
        joined: format_join_date(&user.join_date),
        sections: vec![
            section(
                "Contact Information",
                &[("Email", &user.email), ("Phone", &user.phone_number)],
            ),
            section(
                "Business Information",
                &[
                    ("Funding Use", &user.funding_use),
                    ("Future Vision", &user.future_vision),
                    ("Problem Solving", &user.problem_solving),
                ],
            ),
            section(
                "Experience & Planning",
                &[
                    ("Personal Experience", &user.personal_experience),
                    ("Unique Solution", &user.unique_solution),
                    ("Validation", &user.validation),
                    ("No Funding Plan", &user.no_funding_plan),
                ],
            ),
        ],
        funding_plan,
        funding_plan_warning: funding_plan.needs_attention(),
    }
}

fn section(title: &str, fields: &[(&str, &String)]) -> DetailSection {
    DetailSection {
        title: title.to_string(),
        fields: fields
            .iter()
            .map(|(label, value)| {
                let specified = !value.trim().is_empty();
                DetailField {
                    label: label.to_string(),
                    value: if specified { value.to_string() } else { NOT_SPECIFIED.to_string() },
                    specified,
                }
            })
            .collect(),
    }
}

/// Calendar date (`YYYY-MM-DD`) of a stored timestamp; unparseable values are shown as stored
pub fn format_join_date(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, status: UserStatus) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            display_name: "Ana".into(),
            email: "ana@x.com".into(),
            phone_number: String::new(),
            funding_use: "Hiring".into(),
            future_vision: String::new(),
            problem_solving: String::new(),
            personal_experience: String::new(),
            unique_solution: String::new(),
            validation: String::new(),
            no_funding_plan: "Yes, savings".into(),
            status,
            join_date: "2024-02-10T15:04:05Z".into(),
        }
    }

    #[test]
    fn renders_nothing_without_a_record() {
        assert!(UserDetailView::new(None, true).render().is_none());
        assert!(UserDetailView::new(Some(user("u1", UserStatus::Active)), false).render().is_none());
    }

    #[test]
    fn blank_answers_render_as_not_specified() {
        let detail = UserDetailView::open(user("u1", UserStatus::Active)).render().unwrap();

        let business = &detail.sections[1];
        assert_eq!(business.title, "Business Information");
        assert_eq!(business.fields[0].value, "Hiring");
        assert!(business.fields[0].specified);
        assert_eq!(business.fields[1].value, NOT_SPECIFIED);
        assert!(!business.fields[1].specified);
    }

    #[test]
    fn header_carries_status_selector_and_date() {
        let detail = UserDetailView::open(user("u1", UserStatus::Pending)).render().unwrap();

        assert_eq!(detail.joined, "2024-02-10");
        assert_eq!(detail.status_variant, "destructive");
        let selected: Vec<_> = detail.status_options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, UserStatus::Pending);
        assert_eq!(detail.status_options.len(), 3);
    }

    #[test]
    fn funding_plan_is_classified() {
        let detail = UserDetailView::open(user("u1", UserStatus::Active)).render().unwrap();
        assert_eq!(detail.funding_plan, FundingPlan::Yes);
        assert!(detail.funding_plan_warning);
    }

    #[test]
    fn select_status_invokes_callback_with_id() {
        let view = UserDetailView::open(user("u1", UserStatus::Pending));

        let seen = view.select_status(UserStatus::Active, |id, status| (id.to_string(), status));
        assert_eq!(seen, Some(("u1".to_string(), UserStatus::Active)));

        let unchanged = view.select_status(UserStatus::Pending, |_, _| ());
        assert!(unchanged.is_none());

        let empty = UserDetailView::default();
        assert!(empty.select_status(UserStatus::Active, |_, _| ()).is_none());
    }

    #[test]
    fn reconcile_only_applies_to_the_same_record() {
        let mut view = UserDetailView::open(user("u1", UserStatus::Pending));

        view.reconcile(&user("u2", UserStatus::Active));
        assert_eq!(view.record().unwrap().status, UserStatus::Pending);

        view.reconcile(&user("u1", UserStatus::Active));
        assert_eq!(view.record().unwrap().status, UserStatus::Active);

        view.close();
        assert!(!view.is_open());
        assert!(view.render().is_none());
    }

    #[test]
    fn join_date_formats() {
        assert_eq!(format_join_date("2023-11-05T08:30:00.000Z"), "2023-11-05");
        assert_eq!(format_join_date("2023-11-05"), "2023-11-05");
        assert_eq!(format_join_date("last tuesday"), "last tuesday");
    }
}
