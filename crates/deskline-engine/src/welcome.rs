// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text of the system-authored welcome message.

use deskline_core::Conversation;

const MISSING: &str = "N/A";

/// Renders the greeting and, when intake data exists, the intake summary.
pub(crate) fn render(greeting: &str, conversation: &Conversation) -> String {
    let name = conversation
        .intake
        .as_ref()
        .map_or(conversation.customer_name.as_str(), |i| i.name.as_str());
    let mut text = greeting.replace("{name}", name);

    let Some(intake) = &conversation.intake else {
        return text;
    };

    text.push_str("\n\nPlease confirm the details below:\n");
    let rows = [
        ("Name", intake.name.clone()),
        ("Phone", intake.phone.clone().filter(|p| !p.is_empty()).unwrap_or_else(|| MISSING.into())),
        ("Distributor", intake.distributor.clone()),
        ("Region", intake.region.clone()),
        ("Service", intake.service_option.clone()),
        ("Site", intake.site_code.clone()),
        ("Component", intake.component.clone()),
        ("Controller model", intake.controller_model.clone()),
        ("Communication", intake.communication_display()),
        ("IP", intake.ip.clone().unwrap_or_default()),
        ("Port", intake.port.clone().unwrap_or_default()),
    ];
    let lines: Vec<String> = rows
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect();
    text.push_str(&lines.join("\n"));
    text
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use deskline_core::IntakeFields;

    use super::*;

    const GREETING: &str = "Hi {name}, your support session is starting.";

    #[test]
    fn greeting_only_without_intake() {
        let convo = Conversation::new_pending("c", "Ana", Utc::now());
        assert_eq!(render(GREETING, &convo), "Hi Ana, your support session is starting.");
    }

    #[test]
    fn intake_fields_are_listed() {
        let mut convo = Conversation::new_pending("c", "Ana", Utc::now());
        convo.intake = Some(IntakeFields {
            name: "Ana Souza".into(),
            distributor: "North".into(),
            comm_mode: "GPRS".into(),
            comm_subtype: Some("V2COM".into()),
            port: Some("502".into()),
            ..IntakeFields::default()
        });
        let text = render(GREETING, &convo);
        assert!(text.starts_with("Hi Ana Souza,"));
        assert!(text.contains("Phone: N/A"));
        assert!(text.contains("Distributor: North"));
        assert!(text.contains("Communication: GPRS - V2COM"));
        assert!(text.ends_with("Port: 502"));
    }
}
