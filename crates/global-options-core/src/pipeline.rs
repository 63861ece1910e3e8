//! Host content pipeline
//!
//! A page builder exposes several points where content passes through
//! filters: raw text before rendering, the structured settings of each
//! element, and the final markup of each element. Transformers register
//! against these hooks with a priority; the host calls
//! [`TransformerRegistry::apply`] at each point.

use std::fmt;
use std::sync::Arc;

use crate::settings::SettingsRecord;
use crate::tags::TagResolver;
use crate::value::Value;

/// Extension points of the host's render pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Raw text content of a dynamic-data field
    RenderData,
    /// Structured per-element configuration, before the element renders
    ElementSettings,
    /// Final markup of a rendered element
    RenderElement,
}

impl Hook {
    /// All hooks in pipeline order
    pub const ALL: [Hook; 3] = [Hook::RenderData, Hook::ElementSettings, Hook::RenderElement];

    /// Host filter name of this hook
    pub fn name(&self) -> &'static str {
        match self {
            Hook::RenderData => "frontend/render_data",
            Hook::ElementSettings => "element/settings",
            Hook::RenderElement => "frontend/render_element",
        }
    }

    /// Priority the global tag transformer registers with
    ///
    /// Text and settings are handled early; rendered markup is handled
    /// late to catch tags other filters introduced.
    pub fn tag_priority(&self) -> i32 {
        match self {
            Hook::RenderData | Hook::ElementSettings => 5,
            Hook::RenderElement => 999,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-request data handed to transformers
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Settings snapshot taken at the start of the request
    pub settings: &'a SettingsRecord,
    /// Post being rendered, if any
    pub post_id: Option<u64>,
    /// Element being rendered, if any
    pub element_id: Option<String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(settings: &'a SettingsRecord) -> Self {
        Self {
            settings,
            post_id: None,
            element_id: None,
        }
    }

    pub fn with_post_id(mut self, post_id: u64) -> Self {
        self.post_id = Some(post_id);
        self
    }

    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }
}

/// A filter the host runs content through at a hook
pub trait ContentTransformer: Send + Sync {
    /// Transform content passing through `hook`
    fn transform(&self, hook: Hook, content: Value, ctx: &RenderContext<'_>) -> Value;

    /// Get the name of this transformer
    fn name(&self) -> &str;
}

/// A simple function-based transformer
pub struct FnTransformer<F>
where
    F: Fn(Hook, Value, &RenderContext<'_>) -> Value + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnTransformer<F>
where
    F: Fn(Hook, Value, &RenderContext<'_>) -> Value + Send + Sync,
{
    /// Create a new function-based transformer
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ContentTransformer for FnTransformer<F>
where
    F: Fn(Hook, Value, &RenderContext<'_>) -> Value + Send + Sync,
{
    fn transform(&self, hook: Hook, content: Value, ctx: &RenderContext<'_>) -> Value {
        (self.func)(hook, content, ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Replaces `{global_*}` tags at every hook
///
/// The text hooks only touch strings and the settings hook only touches
/// sequences and mappings. Empty content and content of another shape pass
/// through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalTagTransformer;

impl ContentTransformer for GlobalTagTransformer {
    fn transform(&self, hook: Hook, content: Value, ctx: &RenderContext<'_>) -> Value {
        if content.is_empty() {
            return content;
        }

        let applies = match hook {
            Hook::RenderData | Hook::RenderElement => content.is_string(),
            Hook::ElementSettings => content.is_mapping() || content.is_sequence(),
        };
        if !applies {
            return content;
        }

        TagResolver::new(ctx.settings).resolve(content)
    }

    fn name(&self) -> &str {
        "global_tags"
    }
}

#[derive(Clone)]
struct Registration {
    hook: Hook,
    priority: i32,
    transformer: Arc<dyn ContentTransformer>,
}

/// Transformers registered per hook, ordered by priority
///
/// Lower priorities run first; equal priorities run in registration order.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    entries: Vec<Registration>,
}

impl TransformerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the global tag transformer at every hook
    pub fn with_global_tags() -> Self {
        let mut registry = Self::new();
        let tags: Arc<dyn ContentTransformer> = Arc::new(GlobalTagTransformer);
        for hook in Hook::ALL {
            registry.register(hook, hook.tag_priority(), Arc::clone(&tags));
        }
        registry
    }

    /// Register a transformer at a hook
    pub fn register(&mut self, hook: Hook, priority: i32, transformer: Arc<dyn ContentTransformer>) {
        self.entries.push(Registration {
            hook,
            priority,
            transformer,
        });
        // Stable sort keeps registration order among equal priorities
        self.entries.sort_by_key(|r| r.priority);
    }

    /// Register a function as a transformer
    pub fn register_fn<F>(&mut self, hook: Hook, priority: i32, name: impl Into<String>, func: F)
    where
        F: Fn(Hook, Value, &RenderContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.register(hook, priority, Arc::new(FnTransformer::new(name, func)));
    }

    /// Names of the transformers at a hook, in the order they run
    pub fn transformers(&self, hook: Hook) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|r| r.hook == hook)
            .map(|r| r.transformer.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run content through every transformer registered at `hook`
    pub fn apply(&self, hook: Hook, content: Value, ctx: &RenderContext<'_>) -> Value {
        let mut content = content;
        for reg in self.entries.iter().filter(|r| r.hook == hook) {
            log::debug!(
                "Applying transformer '{}' at {} (priority {})",
                reg.transformer.name(),
                hook,
                reg.priority
            );
            content = reg.transformer.transform(hook, content, ctx);
        }
        content
    }

    /// Run text through a text hook and return the resulting string
    pub fn apply_text(&self, hook: Hook, text: &str, ctx: &RenderContext<'_>) -> String {
        match self.apply(hook, Value::from(text), ctx) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|r| (r.hook, r.priority, r.transformer.name())),
            )
            .finish()
    }
}
