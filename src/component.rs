//! Component functions.
//!
//! A component is any function whose parameters are one of the supported
//! shapes below. The builder decides what to hand over from the shape alone,
//! so components never see arguments they did not ask for.
//!
//! | signature                       | receives                                  |
//! |---------------------------------|-------------------------------------------|
//! | `Fn() -> R`                     | nothing                                   |
//! | `Fn(Props) -> R`                | the merged attributes                     |
//! | `Fn(Node) -> R`                 | a provisional `fragment` node             |
//! | `Fn(Props, Vec<Child>) -> R`    | the merged attributes and the children    |
//!
//! `R` is anything implementing [`IntoRender`].

use std::fmt;

use crate::node::{Child, Markup, Node, Props};
use crate::{Result, StrikeError};

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// The first builder argument: a literal tag name or a component.
pub enum Tag<'a> {
    Name(String),
    Component(Component<'a>),
}

impl fmt::Debug for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Tag::Component(c) => f.debug_tuple("Component").field(&c.name).finish(),
        }
    }
}

/// Conversion into a [`Tag`]. The marker parameter keeps the string and
/// function impls apart.
pub trait IntoTag<'a, Marker> {
    fn into_tag(self) -> Tag<'a>;
}

#[doc(hidden)]
pub struct NameMarker;

#[doc(hidden)]
pub struct FnMarker<M>(std::marker::PhantomData<M>);

impl<'a> IntoTag<'a, NameMarker> for &str {
    fn into_tag(self) -> Tag<'a> {
        Tag::Name(self.to_string())
    }
}

impl<'a> IntoTag<'a, NameMarker> for String {
    fn into_tag(self) -> Tag<'a> {
        Tag::Name(self)
    }
}

impl<'a> IntoTag<'a, NameMarker> for Tag<'a> {
    fn into_tag(self) -> Tag<'a> {
        self
    }
}

impl<'a> IntoTag<'a, NameMarker> for Component<'a> {
    fn into_tag(self) -> Tag<'a> {
        Tag::Component(self)
    }
}

impl<'a, M, F> IntoTag<'a, FnMarker<M>> for F
where
    F: ComponentFn<M> + 'a,
{
    fn into_tag(self) -> Tag<'a> {
        Tag::Component(Component::new(self))
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// What the builder collected for a component call.
#[derive(Debug, Clone, Default)]
pub struct ComponentInput {
    pub props: Props,
    pub children: Vec<Child>,
}

/// A type-erased component ready to be expanded once.
pub struct Component<'a> {
    name: &'static str,
    func: Box<dyn FnOnce(ComponentInput) -> Result<Option<Node>> + 'a>,
}

impl<'a> Component<'a> {
    pub fn new<M, F: ComponentFn<M> + 'a>(func: F) -> Self {
        Self {
            name: short_type_name::<F>(),
            func: Box::new(move |input| func.call(input)),
        }
    }

    /// Name used in logs and expansion errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rename the component; closures otherwise show up as `{{closure}}`.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Run the function. `Ok(None)` means it produced nothing renderable.
    pub(crate) fn invoke(self, input: ComponentInput) -> Result<Option<Node>> {
        (self.func)(input)
    }
}

impl fmt::Debug for Component<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").field("name", &self.name).finish()
    }
}

/// Wrap a function as a component, with an explicit name.
pub fn component<'a, M, F: ComponentFn<M> + 'a>(name: &'static str, func: F) -> Component<'a> {
    Component::new(func).named(name)
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Keep `module::function` readable; closures keep their enclosing path.
    full.rsplit("::")
        .find(|segment| !segment.starts_with('{'))
        .unwrap_or(full)
}

/// A function usable as a component. Implemented for the four signatures
/// in the module docs.
pub trait ComponentFn<Marker> {
    fn call(self, input: ComponentInput) -> Result<Option<Node>>;
}

impl<F, R> ComponentFn<fn() -> R> for F
where
    F: FnOnce() -> R,
    R: IntoRender,
{
    fn call(self, _input: ComponentInput) -> Result<Option<Node>> {
        self().into_render()
    }
}

impl<F, R> ComponentFn<fn(Props) -> R> for F
where
    F: FnOnce(Props) -> R,
    R: IntoRender,
{
    fn call(self, input: ComponentInput) -> Result<Option<Node>> {
        self(input.props).into_render()
    }
}

impl<F, R> ComponentFn<fn(Node) -> R> for F
where
    F: FnOnce(Node) -> R,
    R: IntoRender,
{
    fn call(self, input: ComponentInput) -> Result<Option<Node>> {
        self(Node::fragment(input.props, input.children)).into_render()
    }
}

impl<F, R> ComponentFn<fn(Props, Vec<Child>) -> R> for F
where
    F: FnOnce(Props, Vec<Child>) -> R,
    R: IntoRender,
{
    fn call(self, input: ComponentInput) -> Result<Option<Node>> {
        self(input.props, input.children).into_render()
    }
}

// ---------------------------------------------------------------------------
// IntoRender
// ---------------------------------------------------------------------------

/// Component return values. `Ok(None)` marks a value that cannot be
/// rendered; the builder turns it into a construction error naming the
/// component.
pub trait IntoRender {
    fn into_render(self) -> Result<Option<Node>>;
}

impl IntoRender for Node {
    fn into_render(self) -> Result<Option<Node>> {
        Ok(Some(self))
    }
}

impl IntoRender for String {
    fn into_render(self) -> Result<Option<Node>> {
        Ok(Some(Node::fragment(Props::new(), vec![Child::Text(self)])))
    }
}

impl IntoRender for &str {
    fn into_render(self) -> Result<Option<Node>> {
        self.to_string().into_render()
    }
}

impl IntoRender for Markup {
    fn into_render(self) -> Result<Option<Node>> {
        Ok(Some(Node::fragment(Props::new(), vec![Child::Raw(self)])))
    }
}

impl IntoRender for () {
    fn into_render(self) -> Result<Option<Node>> {
        Ok(None)
    }
}

impl<T: IntoRender> IntoRender for Option<T> {
    fn into_render(self) -> Result<Option<Node>> {
        match self {
            Some(value) => value.into_render(),
            None => Ok(None),
        }
    }
}

impl<T, E> IntoRender for std::result::Result<T, E>
where
    T: IntoRender,
    E: Into<StrikeError>,
{
    fn into_render(self) -> Result<Option<Node>> {
        self.map_err(Into::into)?.into_render()
    }
}
