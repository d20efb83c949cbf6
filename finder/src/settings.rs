use serde::{Deserialize, Serialize};
use url::form_urlencoded::Serializer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Instant,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Instant => "instant",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailFormat {
    Plain,
    Html,
}

impl EmailFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailFormat::Plain => "plain",
            EmailFormat::Html => "html",
        }
    }
}

/// One subscription whose frequency moves from `old_frequency` to `new_frequency`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    pub subject_name: String,
    pub old_frequency: Frequency,
    pub new_frequency: Frequency,
}

/// A call to the subscription endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SubscribeAction {
    Subscribe { subject_name: String, frequency: Option<Frequency> },
    Unsubscribe { subject_name: String },
    UnsubscribeMultiple { subjects: Vec<String> },
    ChangeDefaultFrequency { frequency: Frequency },
    ChangeSubscriptions { subject_changes: Vec<ChangeInfo> },
    ChangeSubscription { subject_name: String, old_frequency: Frequency, new_frequency: Frequency },
    ChangeEmailFormat { email_format: EmailFormat },
    ChangeLocale { locale: String },
}

impl SubscribeAction {
    pub fn name(&self) -> &'static str {
        match self {
            SubscribeAction::Subscribe { .. } => "subscribe",
            SubscribeAction::Unsubscribe { .. } => "unsubscribe",
            SubscribeAction::UnsubscribeMultiple { .. } => "unsubscribe_multiple",
            SubscribeAction::ChangeDefaultFrequency { .. } => "change_default_frequency",
            SubscribeAction::ChangeSubscriptions { .. } => "change_subscriptions",
            SubscribeAction::ChangeSubscription { .. } => "change_subscription",
            SubscribeAction::ChangeEmailFormat { .. } => "change_email_format",
            SubscribeAction::ChangeLocale { .. } => "change_locale",
        }
    }

    /// URL-encoded POST body. List arguments travel as JSON strings.
    pub fn form_body(&self, subdomain: &str) -> serde_json::Result<String> {
        let mut f = Serializer::new(String::new());
        f.append_pair("subdomain", subdomain);
        f.append_pair("action", self.name());
        match self {
            SubscribeAction::Subscribe { subject_name, frequency } => {
                f.append_pair("subject_name", subject_name);
                if let Some(fr) = frequency {
                    f.append_pair("frequency", fr.as_str());
                }
            }
            SubscribeAction::Unsubscribe { subject_name } => {
                f.append_pair("subject_name", subject_name);
            }
            SubscribeAction::UnsubscribeMultiple { subjects } => {
                f.append_pair("subjects", &serde_json::to_string(subjects)?);
            }
            SubscribeAction::ChangeDefaultFrequency { frequency } => {
                f.append_pair("frequency", frequency.as_str());
            }
            SubscribeAction::ChangeSubscriptions { subject_changes } => {
                f.append_pair("subject_changes", &serde_json::to_string(subject_changes)?);
            }
            SubscribeAction::ChangeSubscription { subject_name, old_frequency, new_frequency } => {
                f.append_pair("subject_name", subject_name);
                f.append_pair("old_frequency", old_frequency.as_str());
                f.append_pair("new_frequency", new_frequency.as_str());
            }
            SubscribeAction::ChangeEmailFormat { email_format } => {
                f.append_pair("email_format", email_format.as_str());
            }
            SubscribeAction::ChangeLocale { locale } => {
                f.append_pair("locale", locale);
            }
        }
        Ok(f.finish())
    }
}

/// Current frequency of each subscription shown on the settings page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRow {
    pub subject_name: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub checked: bool,
}

/// Move every checked subscription to the account default; returns the
/// change list for the ones that actually differ.
pub fn set_checked_to_default(rows: &mut [SubscriptionRow], default: Frequency) -> Vec<ChangeInfo> {
    let mut changes = Vec::new();
    for row in rows.iter_mut().filter(|r| r.checked) {
        if row.frequency != default {
            changes.push(ChangeInfo {
                subject_name: row.subject_name.clone(),
                old_frequency: row.frequency,
                new_frequency: default,
            });
            row.frequency = default;
        }
    }
    changes
}

pub fn checked_subjects(rows: &[SubscriptionRow]) -> Vec<String> {
    rows.iter().filter(|r| r.checked).map(|r| r.subject_name.clone()).collect()
}

/// Request to delete a facility permanently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeRequest {
    pub subdomain: String,
    pub subject_name: String,
}

impl PurgeRequest {
    pub fn form_body(&self) -> String {
        Serializer::new(String::new())
            .append_pair("subdomain", &self.subdomain)
            .append_pair("subject_name", &self.subject_name)
            .finish()
    }

    /// Body to post, or `None` if the user declined the confirmation prompt.
    pub fn confirmed<F: FnOnce(&str) -> bool>(&self, prompt_text: &str, confirm: F) -> Option<String> {
        if confirm(prompt_text) {
            Some(self.form_body())
        } else {
            log::info!("purge of {} cancelled", self.subject_name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_bodies() {
        let a = SubscribeAction::Subscribe { subject_name: "haiti/a b".into(), frequency: Some(Frequency::Daily) };
        assert_eq!(
            a.form_body("haiti").unwrap(),
            "subdomain=haiti&action=subscribe&subject_name=haiti%2Fa+b&frequency=daily"
        );
        let m = SubscribeAction::UnsubscribeMultiple { subjects: vec!["x".into()] };
        assert_eq!(m.form_body("h").unwrap(), "subdomain=h&action=unsubscribe_multiple&subjects=%5B%22x%22%5D");
    }

    #[test]
    fn parses_action_objects() {
        let a: SubscribeAction =
            serde_json::from_str(r#"{"action": "change_default_frequency", "frequency": "weekly"}"#).unwrap();
        assert_eq!(a, SubscribeAction::ChangeDefaultFrequency { frequency: Frequency::Weekly });
    }

    #[test]
    fn checked_rows_move_to_default() {
        let mut rows = vec![
            SubscriptionRow { subject_name: "a".into(), frequency: Frequency::Instant, checked: true },
            SubscriptionRow { subject_name: "b".into(), frequency: Frequency::Daily, checked: true },
            SubscriptionRow { subject_name: "c".into(), frequency: Frequency::Monthly, checked: false },
        ];
        let changes = set_checked_to_default(&mut rows, Frequency::Daily);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_frequency, Frequency::Instant);
        assert_eq!(rows[0].frequency, Frequency::Daily);
        assert_eq!(rows[2].frequency, Frequency::Monthly);
        assert_eq!(checked_subjects(&rows), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn purge_requires_confirmation() {
        let p = PurgeRequest { subdomain: "haiti".into(), subject_name: "x".into() };
        assert_eq!(p.confirmed("sure?", |_| false), None);
        assert_eq!(p.confirmed("sure?", |t| t == "sure?").as_deref(), Some("subdomain=haiti&subject_name=x"));
    }
}
