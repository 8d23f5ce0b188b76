#![forbid(unsafe_code)]

//! The template capability.
//!
//! A template is applied to positional arguments, then keyword data, and
//! yields an ordered list of fresh tree nodes. Ownership of those nodes moves
//! to the caller.

use std::fmt;
use std::rc::Rc;

use declet_tree::DeclarativeRef;

use crate::error::TemplateError;

/// A template argument or keyword value.
pub type Value = serde_json::Value;

/// Positional template arguments.
pub type Args = Vec<Value>;

/// Keyword data handed to an instantiated template.
pub type Data = serde_json::Map<String, Value>;

/// A parameterized producer of tree nodes.
pub trait Template {
    /// Name used in errors and logs.
    fn name(&self) -> &str;

    /// Apply `args` positionally, then `data` as keywords, and return the
    /// produced items in order.
    ///
    /// # Errors
    ///
    /// Wrong positional arity, or any failure raised by the template body.
    fn instantiate(&self, args: &[Value], data: &Data)
    -> Result<Vec<DeclarativeRef>, TemplateError>;
}

/// Shared handle to a template, compared by identity.
///
/// Two handles are equal only when they point at the same template object,
/// so re-assigning the current template is not a change.
#[derive(Clone)]
pub struct TemplateRef(Rc<dyn Template>);

impl TemplateRef {
    pub fn new(template: impl Template + 'static) -> Self {
        Self(Rc::new(template))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// See [`Template::instantiate`].
    ///
    /// # Errors
    ///
    /// Propagates the template's error unchanged.
    pub fn instantiate(
        &self,
        args: &[Value],
        data: &Data,
    ) -> Result<Vec<DeclarativeRef>, TemplateError> {
        self.0.instantiate(args, data)
    }
}

impl From<Rc<dyn Template>> for TemplateRef {
    fn from(template: Rc<dyn Template>) -> Self {
        Self(template)
    }
}

impl PartialEq for TemplateRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Eq for TemplateRef {}

impl fmt::Debug for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TemplateRef").field(&self.name()).finish()
    }
}

type Body = dyn Fn(&[Value], &Data) -> Result<Vec<DeclarativeRef>, TemplateError>;

/// A template backed by a closure with a fixed positional parameter list.
pub struct FnTemplate {
    name: String,
    params: Vec<String>,
    body: Box<Body>,
}

impl fmt::Debug for FnTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTemplate")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl FnTemplate {
    pub fn new<I, S>(
        name: impl Into<String>,
        params: I,
        body: impl Fn(&[Value], &Data) -> Result<Vec<DeclarativeRef>, TemplateError> + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        }
    }

    /// Positional parameter names.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl Template for FnTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(
        &self,
        args: &[Value],
        data: &Data,
    ) -> Result<Vec<DeclarativeRef>, TemplateError> {
        if args.len() != self.params.len() {
            return Err(TemplateError::Arity {
                template: self.name.clone(),
                expected: self.params.len(),
                given: args.len(),
            });
        }
        (self.body)(args, data)
    }
}
