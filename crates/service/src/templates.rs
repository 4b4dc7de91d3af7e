use tera::{Context, Tera};

use furlough_core::effects::EmailRequest;

const ESCALATION_HTML: &str = r#"<p>Hello {{ approver_name }},</p>
<p>A leave request from <strong>{{ requester_name }}</strong>
({{ start_date }} to {{ end_date }}) has been waiting for a decision and was
escalated to you at level {{ level }}.</p>
<p>Reason: {{ reason }}</p>
<p>Please review it at your earliest convenience.</p>"#;

const AUTO_APPROVAL_HTML: &str = r#"<p>Hello {{ requester_name }},</p>
<p>Your leave request ({{ start_date }} to {{ end_date }}) was approved
automatically after the approval chain was exhausted.</p>"#;

const PLAN_SUBMITTED_HTML: &str = r#"<p>Hello {{ manager_name }},</p>
<p><strong>{{ user_name }}</strong> submitted a holiday plan for
{{ year }} with {{ date_count }} planned day(s).</p>
<p>Please review the team calendar for overlaps.</p>"#;

fn render(template_name: &str, template: &str, context: &Context, fallback: &str) -> String {
    let mut tera = Tera::default();
    if tera.add_raw_template(template_name, template).is_err() {
        return fallback.to_string();
    }
    tera.render(template_name, context).unwrap_or_else(|error| {
        tracing::warn!(
            event_name = "templates.render_failed",
            template = template_name,
            error = %error,
            "email template failed to render, using plain-text fallback"
        );
        fallback.to_string()
    })
}

pub struct EscalationEmail<'a> {
    pub to: &'a str,
    pub approver_name: &'a str,
    pub requester_name: &'a str,
    pub start_date: String,
    pub end_date: String,
    pub level: u32,
    pub reason: &'a str,
}

pub fn escalation_email(input: EscalationEmail<'_>) -> EmailRequest {
    let text = format!(
        "A leave request from {} ({} to {}) was escalated to you at level {}. Reason: {}",
        input.requester_name, input.start_date, input.end_date, input.level, input.reason
    );

    let mut context = Context::new();
    context.insert("approver_name", input.approver_name);
    context.insert("requester_name", input.requester_name);
    context.insert("start_date", &input.start_date);
    context.insert("end_date", &input.end_date);
    context.insert("level", &input.level);
    context.insert("reason", input.reason);

    EmailRequest {
        to: input.to.to_string(),
        subject: format!("Leave approval escalated to you (level {})", input.level),
        html: render("escalation", ESCALATION_HTML, &context, &text),
        text,
    }
}

pub fn auto_approval_email(
    to: &str,
    requester_name: &str,
    start_date: String,
    end_date: String,
) -> EmailRequest {
    let text = format!(
        "Your leave request ({start_date} to {end_date}) was approved automatically after the approval chain was exhausted."
    );

    let mut context = Context::new();
    context.insert("requester_name", requester_name);
    context.insert("start_date", &start_date);
    context.insert("end_date", &end_date);

    EmailRequest {
        to: to.to_string(),
        subject: "Leave request auto-approved".to_string(),
        html: render("auto_approval", AUTO_APPROVAL_HTML, &context, &text),
        text,
    }
}

pub fn plan_submitted_email(
    to: &str,
    manager_name: &str,
    user_name: &str,
    year: i32,
    date_count: usize,
) -> EmailRequest {
    let text = format!("{user_name} submitted a holiday plan for {year} with {date_count} planned day(s).");

    let mut context = Context::new();
    context.insert("manager_name", manager_name);
    context.insert("user_name", user_name);
    context.insert("year", &year);
    context.insert("date_count", &date_count);

    EmailRequest {
        to: to.to_string(),
        subject: format!("Holiday plan submitted for {year}"),
        html: render("plan_submitted", PLAN_SUBMITTED_HTML, &context, &text),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::{escalation_email, plan_submitted_email, EscalationEmail};

    #[test]
    fn escalation_email_carries_the_chain_details() {
        let email = escalation_email(EscalationEmail {
            to: "dara.iqbal@company.test",
            approver_name: "Dara Iqbal",
            requester_name: "Ada Keller",
            start_date: "2026-03-02".to_string(),
            end_date: "2026-03-04".to_string(),
            level: 2,
            reason: "no decision after 3 business days",
        });

        assert_eq!(email.to, "dara.iqbal@company.test");
        assert!(email.subject.contains("level 2"));
        assert!(email.html.contains("Ada Keller"));
        assert!(email.html.contains("2026-03-02"));
        assert!(email.text.contains("no decision after 3 business days"));
    }

    #[test]
    fn plan_submission_email_addresses_the_manager() {
        let email =
            plan_submitted_email("mikel.sousa@company.test", "Mikel Sousa", "Ada Keller", 2027, 12);
        assert!(email.html.contains("Mikel Sousa"));
        assert!(email.html.contains("12"));
        assert!(email.text.contains("2027"));
    }
}
