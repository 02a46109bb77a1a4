use std::path::{Path, PathBuf};
use backdrop_common::error::StyleError;
use backdrop_common::{BackdropError, ImageRef, Result, StyleRule, StyleSink, TransitionEnd};

/// Style sink that keeps the background as a CSS snippet file the host
/// page loads. The file exists exactly while the resource does.
///
/// The host gives no completion signal back, so a fade is considered
/// finished once its duration has elapsed.
#[derive(Debug)]
pub struct SnippetSink {
    path: PathBuf,
    rule: Option<StyleRule>,
    image: Option<ImageRef>,
    active: bool,
}

impl SnippetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rule: None,
            image: None,
            active: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, rule: &StyleRule) -> String {
        let opacity = if self.active { rule.opacity } else { 0.0 };
        let image = match &self.image {
            Some(image) => format!("url(\"{}\")", css_escape(image.as_str())),
            None => "none".to_string(),
        };
        format!(
            "body {{\n  transition: opacity {}ms;\n  background-size: cover;\n  background-position: center;\n  background-image: {};\n  opacity: {};\n}}\n",
            rule.duration.as_millis(),
            image,
            opacity
        )
    }

    fn write(&self) -> Result<()> {
        let rule = self.rule.as_ref().ok_or(StyleError::NoResource)?;
        let write_error = |e| BackdropError::Style(StyleError::Write {
            path: self.path.clone(),
            source: e,
        });

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(&self.path, self.render(rule)).map_err(write_error)?;
        Ok(())
    }
}

/// Escapes a value for a double-quoted CSS string.
fn css_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\a "),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl StyleSink for SnippetSink {
    fn create(&mut self, rule: StyleRule) -> Result<()> {
        self.rule = Some(rule);
        self.image = None;
        self.active = false;
        self.write()?;
        log::debug!("Created style snippet at {:?}", self.path);
        Ok(())
    }

    fn update_rule(&mut self, rule: StyleRule) -> Result<()> {
        if self.rule.is_none() {
            return Err(StyleError::NoResource.into());
        }
        self.rule = Some(rule);
        self.write()
    }

    fn set_background(&mut self, image: Option<&ImageRef>) -> Result<()> {
        if self.rule.is_none() {
            return Err(StyleError::NoResource.into());
        }
        self.image = image.cloned();
        self.write()
    }

    fn set_active(&mut self, active: bool) -> Result<TransitionEnd> {
        let Some(rule) = self.rule else {
            return Err(StyleError::NoResource.into());
        };
        self.active = active;
        self.write()?;

        if rule.duration.is_zero() {
            return Ok(TransitionEnd::completed());
        }
        let (signal, end) = TransitionEnd::channel();
        tokio::spawn(async move {
            tokio::time::sleep(rule.duration).await;
            signal.complete();
        });
        Ok(end)
    }

    fn remove(&mut self) -> Result<()> {
        self.rule = None;
        self.image = None;
        self.active = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StyleError::Remove {
                    path: self.path.clone(),
                    source: e,
                }
                .into())
            }
        }
        log::debug!("Removed style snippet {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_common::{ConfigStore, LocalVault, Phase, RotationController, Settings};
    use backdrop_config::JsonConfigStore;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn rule(ms: u64) -> StyleRule {
        StyleRule {
            duration: Duration::from_millis(ms),
            opacity: 0.8,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_snippet_follows_resource_lifecycle() {
        let dir = tempdir().unwrap();
        let mut sink = SnippetSink::new(dir.path().join("style").join("background.css"));

        sink.create(rule(1000)).unwrap();
        let css = fs::read_to_string(sink.path()).unwrap();
        assert!(css.contains("transition: opacity 1000ms;"));
        assert!(css.contains("background-image: none;"));
        assert!(css.contains("opacity: 0;"));

        sink.set_background(Some(&ImageRef::new("file:///vault/bg/a.png"))).unwrap();
        sink.set_active(true).unwrap();
        let css = fs::read_to_string(sink.path()).unwrap();
        assert!(css.contains("background-image: url(\"file:///vault/bg/a.png\");"));
        assert!(css.contains("opacity: 0.8;"));

        sink.remove().unwrap();
        assert!(!sink.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_completes_after_duration() {
        let dir = tempdir().unwrap();
        let mut sink = SnippetSink::new(dir.path().join("background.css"));
        sink.create(rule(500)).unwrap();

        let mut end = sink.set_active(true).unwrap();
        let early = tokio::time::timeout(Duration::from_millis(400), &mut end).await;
        assert!(early.is_err());

        tokio::time::timeout(Duration::from_millis(200), end).await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_duration_completes_immediately() {
        let dir = tempdir().unwrap();
        let mut sink = SnippetSink::new(dir.path().join("background.css"));
        sink.create(rule(0)).unwrap();

        sink.set_active(true).unwrap().await;
    }

    #[test]
    fn test_image_url_is_escaped() {
        assert_eq!(css_escape("file:///bg/plain.png"), "file:///bg/plain.png");
        assert_eq!(css_escape(r#"file:///bg/say "hi".png"#), r#"file:///bg/say \"hi\".png"#);
        assert_eq!(css_escape(r"file:///bg/back\slash.png"), r"file:///bg/back\\slash.png");

        let dir = tempdir().unwrap();
        let mut sink = SnippetSink::new(dir.path().join("background.css"));
        sink.create(rule(0)).unwrap();
        sink.set_background(Some(&ImageRef::new(r#"file:///bg/a"b.png"#))).unwrap();

        let css = fs::read_to_string(sink.path()).unwrap();
        assert!(css.contains(r#"background-image: url("file:///bg/a\"b.png");"#));
    }

    #[test]
    fn test_mutations_need_a_resource() {
        let dir = tempdir().unwrap();
        let mut sink = SnippetSink::new(dir.path().join("background.css"));

        assert!(matches!(
            sink.update_rule(rule(100)),
            Err(BackdropError::Style(StyleError::NoResource))
        ));
        assert!(sink.set_background(None).is_err());
        assert!(sink.set_active(true).is_err());
        sink.remove().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_drives_snippet_file() {
        let vault = tempdir().unwrap();
        fs::create_dir(vault.path().join("bg")).unwrap();
        fs::write(vault.path().join("bg").join("a.png"), "fake image").unwrap();
        fs::write(vault.path().join("bg").join("b.png"), "fake image").unwrap();

        let store = JsonConfigStore::new(vault.path().join("data.json"));
        store
            .save(&Settings {
                folder_path: "bg".to_string(),
                fade_duration_ms: 300,
                rotation_period_ms: 0,
                ..Settings::default()
            })
            .unwrap();
        let snippet = vault.path().join("background.css");
        let mut controller = RotationController::new(
            LocalVault::new(vault.path()),
            SnippetSink::new(&snippet),
            Box::new(store),
        );

        controller.apply_ordered(1).unwrap();
        controller.settle().await.unwrap();
        let css = fs::read_to_string(&snippet).unwrap();
        assert!(css.contains("/bg/b.png\")"));
        assert!(css.contains("opacity: 0.9;"));
        assert_eq!(controller.fade().phase(), Phase::Idle);

        controller.delete_background().unwrap();
        controller.settle().await.unwrap();
        assert!(!snippet.exists());
    }
}
