//! Extension points called by the converter
use std::fmt;
use std::str::FromStr;

use crate::error::ConvertError;

/// A text transform registered on a hook point.
pub type Transform = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Where a transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Link text for a URL that appeared on its own, e.g. `<http://x.com>`.
    PlainLinkText,
    /// Raw source text, before anything else.
    PreConversion,
    /// Final HTML.
    PostConversion,
}

impl HookPoint {
    pub fn name(self) -> &'static str {
        match self {
            HookPoint::PlainLinkText => "plainLinkText",
            HookPoint::PreConversion => "preConversion",
            HookPoint::PostConversion => "postConversion",
        }
    }
}

impl FromStr for HookPoint {
    type Err = ConvertError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "plainLinkText" => Ok(HookPoint::PlainLinkText),
            "preConversion" => Ok(HookPoint::PreConversion),
            "postConversion" => Ok(HookPoint::PostConversion),
            _ => Err(ConvertError::UnknownHook(name.to_string())),
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered transforms per hook point. An empty point is the identity.
#[derive(Default)]
pub struct HookCollection {
    plain_link_text: Vec<Transform>,
    pre_conversion: Vec<Transform>,
    post_conversion: Vec<Transform>,
}

impl HookCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, point: HookPoint) -> &Vec<Transform> {
        match point {
            HookPoint::PlainLinkText => &self.plain_link_text,
            HookPoint::PreConversion => &self.pre_conversion,
            HookPoint::PostConversion => &self.post_conversion,
        }
    }

    fn slot_mut(&mut self, point: HookPoint) -> &mut Vec<Transform> {
        match point {
            HookPoint::PlainLinkText => &mut self.plain_link_text,
            HookPoint::PreConversion => &mut self.pre_conversion,
            HookPoint::PostConversion => &mut self.post_conversion,
        }
    }

    /// Append `f`; it receives the output of the transforms already registered.
    pub fn chain<F>(&mut self, point: HookPoint, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.slot_mut(point).push(Box::new(f));
    }

    /// Replace everything registered on `point` with `f`.
    pub fn set<F>(&mut self, point: HookPoint, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.clear(point);
        self.chain(point, f);
    }

    pub fn clear(&mut self, point: HookPoint) {
        self.slot_mut(point).clear();
    }

    pub fn chain_named<F>(&mut self, name: &str, f: F) -> Result<(), ConvertError>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let point = name.parse()?;
        self.chain(point, f);
        Ok(())
    }

    pub fn set_named<F>(&mut self, name: &str, f: F) -> Result<(), ConvertError>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let point = name.parse()?;
        self.set(point, f);
        Ok(())
    }

    /// Number of transforms registered on `point`.
    pub fn len(&self, point: HookPoint) -> usize {
        self.slot(point).len()
    }

    pub fn is_empty(&self, point: HookPoint) -> bool {
        self.slot(point).is_empty()
    }

    /// Run every transform on `point` in registration order.
    pub fn run(&self, point: HookPoint, text: &str) -> String {
        self.slot(point)
            .iter()
            .fold(text.to_string(), |acc, f| f(&acc))
    }
}

impl fmt::Debug for HookCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCollection")
            .field("plain_link_text", &self.plain_link_text.len())
            .field("pre_conversion", &self.pre_conversion.len())
            .field("post_conversion", &self.post_conversion.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_point_is_identity() {
        let hooks = HookCollection::new();
        assert_eq!(hooks.run(HookPoint::PostConversion, "<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_chain_runs_in_order() {
        let mut hooks = HookCollection::new();
        hooks.chain(HookPoint::PreConversion, |t| format!("{t}a"));
        hooks.chain(HookPoint::PreConversion, |t| format!("{t}b"));
        assert_eq!(hooks.run(HookPoint::PreConversion, "x"), "xab");
        assert_eq!(hooks.len(HookPoint::PreConversion), 2);
    }

    #[test]
    fn test_set_replaces() {
        let mut hooks = HookCollection::new();
        hooks.chain(HookPoint::PlainLinkText, |t| t.to_uppercase());
        hooks.set(HookPoint::PlainLinkText, |_| "link".to_string());
        assert_eq!(hooks.run(HookPoint::PlainLinkText, "http://x"), "link");
        assert_eq!(hooks.len(HookPoint::PlainLinkText), 1);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let mut hooks = HookCollection::new();
        let err = hooks.chain_named("postConvertion", |t| t.to_string()).unwrap_err();
        assert!(matches!(err, ConvertError::UnknownHook(ref name) if name == "postConvertion"));
        assert!(hooks.set_named("preConversion", |t| t.trim().to_string()).is_ok());
        assert_eq!(hooks.run(HookPoint::PreConversion, "  x "), "x");
    }

    #[test]
    fn test_names_round_trip() {
        for point in [HookPoint::PlainLinkText, HookPoint::PreConversion, HookPoint::PostConversion] {
            assert_eq!(point.name().parse::<HookPoint>().unwrap(), point);
        }
    }
}
