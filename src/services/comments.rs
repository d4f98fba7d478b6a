//! Third-party comments widget. The widget is an external script; this
//! module only places its tag into a page container.

use crate::config::CommentsConfig;

/// A fixed-size page region keyed by the page path, whose children the
/// widget owns.
#[derive(Debug, Clone)]
pub struct WidgetContainer {
    key: String,
    children: Vec<String>,
}

impl WidgetContainer {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            children: Vec::new(),
        }
    }

    pub fn replace_children(&mut self, child: String) {
        self.children = vec![child];
    }

    pub fn html(&self) -> String {
        format!(
            r#"<section class="comments" data-page="{}">{}</section>"#,
            attr(&self.key),
            self.children.concat()
        )
    }
}

/// Injects the widget's script tag into `container`. Disabled comments
/// leave the container empty.
pub fn embed(container: &mut WidgetContainer, config: &CommentsConfig) {
    if !config.enabled {
        container.children.clear();
        return;
    }

    let script = format!(
        r#"<script src="{}" repo="{}" issue-term="{}" theme="{}" crossorigin="anonymous" async></script>"#,
        attr(&config.script_src),
        attr(&config.repo),
        attr(&config.issue_term),
        attr(&config.theme),
    );
    container.replace_children(script);
}

fn attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_replaces_children() {
        let config = CommentsConfig::default();
        let mut container = WidgetContainer::new("/post/hello");
        container.replace_children("<p>old</p>".into());

        embed(&mut container, &config);
        let html = container.html();

        assert!(!html.contains("old"));
        assert!(html.contains(r#"src="https://utteranc.es/client.js""#));
        assert!(html.contains(r#"issue-term="pathname""#));
        assert!(html.contains(r#"data-page="/post/hello""#));
    }

    #[test]
    fn test_disabled_comments_leave_container_empty() {
        let config = CommentsConfig {
            enabled: false,
            ..CommentsConfig::default()
        };
        let mut container = WidgetContainer::new("/post/hello");
        container.replace_children("<p>stale</p>".into());

        embed(&mut container, &config);

        assert_eq!(
            container.html(),
            r#"<section class="comments" data-page="/post/hello"></section>"#
        );
    }
}
