//! Confirmation mail dispatch through an HTTP mail relay.
//!
//! Failures here never fail a registration: the caller logs the error and
//! reports a soft `mail_sent` flag to the client.

use crate::{MemberSlot, TeamRecord};
use serde_json::json;
use std::env;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Mail relay settings, read from the environment once at startup.
/// With no `MAIL_RELAY_URL` configured, sends are skipped quietly.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub relay_url: Option<String>,
    pub sender: String,
}

impl MailerConfig {
    pub fn from_env() -> Self {
        Self {
            relay_url: env::var("MAIL_RELAY_URL").ok().filter(|url| !url.is_empty()),
            sender: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@hackathon.example.com".to_string()),
        }
    }
}

/// Send the registration confirmation to every member with an email.
///
/// Returns whether a mail was actually handed to the relay. `Ok(false)`
/// means there was nothing to do (no relay configured or no recipients);
/// `Err` means the relay refused or was unreachable.
pub fn send_confirmation(config: &MailerConfig, team: &TeamRecord) -> Result<bool, String> {
    let Some(relay_url) = &config.relay_url else {
        tracing::debug!("No mail relay configured, skipping confirmation mail");
        return Ok(false);
    };
    let recipients = team.member_emails();
    if recipients.is_empty() {
        return Ok(false);
    }

    let payload = json!({
        "from": config.sender,
        "to": recipients,
        "subject": format!("Team Registration Confirmation - Team ID: {}", team.team_id),
        "text": render_confirmation_body(team),
    });

    let response = reqwest::blocking::Client::builder()
        .timeout(SEND_TIMEOUT)
        .build()
        .map_err(|err| err.to_string())?
        .post(relay_url)
        .json(&payload)
        .send()
        .map_err(|err| err.to_string())?;

    if response.status().is_success() {
        Ok(true)
    } else {
        Err(format!("mail relay returned {}", response.status()))
    }
}

fn render_confirmation_body(team: &TeamRecord) -> String {
    let mut roster = String::new();
    for slot in MemberSlot::ALL {
        let member = team.member(slot);
        if member.name.trim().is_empty() {
            continue;
        }
        let role = match slot {
            MemberSlot::Leader => "Team Lead",
            _ => "Member",
        };
        roster.push_str(&format!("  - {} ({role})\n", member.name.trim()));
    }
    format!(
        "Congratulations! Your team has been registered.\n\n\
         Your Team ID is: {}\n\
         Keep this ID safe. You'll need it for future reference.\n\n\
         Team members:\n{roster}\n\
         If you have any questions, please contact the event organizers.\n",
        team.team_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewTeamInput, TeamMember, Track, merge::new_team_record};
    use chrono::Utc;

    fn team_with_emails() -> TeamRecord {
        let input = NewTeamInput {
            leader: TeamMember {
                name: "Asha Rao".to_string(),
                enrollment: "EN2301".to_string(),
                email: "asha@example.com".to_string(),
            },
            member2: TeamMember {
                name: "Dev Patel".to_string(),
                enrollment: "EN2302".to_string(),
                email: " dev@example.com ".to_string(),
            },
            ..NewTeamInput::default()
        };
        new_team_record("BTECH001".to_string(), Track::BTech, &input, Utc::now())
    }

    #[test]
    fn unconfigured_relay_skips_without_error() {
        let config = MailerConfig {
            relay_url: None,
            sender: "noreply@example.com".to_string(),
        };
        assert_eq!(send_confirmation(&config, &team_with_emails()), Ok(false));
    }

    #[test]
    fn recipient_list_trims_and_drops_blanks() {
        let team = team_with_emails();
        assert_eq!(
            team.member_emails(),
            vec!["asha@example.com".to_string(), "dev@example.com".to_string()]
        );
    }

    #[test]
    fn body_names_the_team_id_and_roster() {
        let body = render_confirmation_body(&team_with_emails());
        assert!(body.contains("BTECH001"));
        assert!(body.contains("Asha Rao (Team Lead)"));
        assert!(body.contains("Dev Patel (Member)"));
    }
}
