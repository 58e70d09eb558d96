//! `{{field}}` substitution for the notification subject and body.

/// Run-specific values merged into the operator's static template.
#[derive(Debug, Clone)]
pub struct TemplateFields {
    pub username: String,
    pub date: String,
    pub time: String,
    /// Outcome label, e.g. "数据提交成功".
    pub result: String,
    /// Stage detail message.
    pub message: String,
}

impl TemplateFields {
    /// Fields for a run ending now.
    #[must_use]
    pub fn now(username: &str, result: &str, message: &str) -> Self {
        let now = chrono::Local::now();
        Self {
            username: username.to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            result: result.to_string(),
            message: message.to_string(),
        }
    }
}

/// Replace every known `{{field}}` placeholder. Unknown placeholders are
/// left as-is so template typos stay visible in the delivered mail.
#[must_use]
pub fn render(template: &str, fields: &TemplateFields) -> String {
    template
        .replace("{{username}}", &fields.username)
        .replace("{{date}}", &fields.date)
        .replace("{{time}}", &fields.time)
        .replace("{{result}}", &fields.result)
        .replace("{{message}}", &fields.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TemplateFields {
        TemplateFields {
            username: "alice".into(),
            date: "2026-08-05".into(),
            time: "07:30:00".into(),
            result: "数据提交成功".into(),
            message: "今日打卡成功".into(),
        }
    }

    #[test]
    fn substitutes_all_fields() {
        let html = render(
            "<p>{{username}} {{date}} {{time}}</p><b>{{result}}</b>: {{message}}",
            &fields(),
        );
        assert_eq!(
            html,
            "<p>alice 2026-08-05 07:30:00</p><b>数据提交成功</b>: 今日打卡成功"
        );
    }

    #[test]
    fn repeated_placeholders_all_replaced() {
        assert_eq!(
            render("{{result}} / {{result}}", &fields()),
            "数据提交成功 / 数据提交成功"
        );
    }

    #[test]
    fn unknown_placeholder_left_as_is() {
        assert_eq!(render("{{whoami}}", &fields()), "{{whoami}}");
    }

    #[test]
    fn now_uses_wall_clock_formats() {
        let f = TemplateFields::now("alice", "r", "m");
        assert_eq!(f.date.len(), 10);
        assert_eq!(f.time.len(), 8);
        assert_eq!(f.result, "r");
    }
}
