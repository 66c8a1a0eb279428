/// Restricts scrobbling to a single Plex account when one is configured
#[derive(Debug, Clone, Default)]
pub struct ViewerFilter {
    viewer: Option<String>,
}

impl ViewerFilter {
    pub fn new(viewer: Option<String>) -> Self {
        Self { viewer }
    }

    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    pub fn accepts(&self, viewer: &str) -> bool {
        match &self.viewer {
            Some(expected) => expected == viewer,
            None => true,
        }
    }
}
