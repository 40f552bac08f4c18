//! Assembly - staged object construction.
//!
//! An [`Assembly`] builds a `T` from options `O` through an intermediate `I`:
//!
//! 1. `instance_factory(options) -> I`
//! 2. intermediate line: each `(I, options) -> I` in registration order
//! 3. `finalizer(I) -> T`
//! 4. result line: each `(T, options) -> T` in registration order
//!
//! Options may be absent. Assemblies are immutable snapshots produced by a
//! [`Builder`] and are cheap to clone and share across threads.
//!
//! # Example
//! ```ignore
//! let greeting = Assembly::<String, String, Options>::builder()
//!     .instance_factory(|o| o.map(|o| o.prefix.clone()).unwrap_or_default())
//!     .add_intermediate_consumer(|s, _| s.push_str("Hello"))
//!     .identity_finalizer()
//!     .add_result_transformer(|s, o| s.repeat(o.map_or(1, |o| o.repeat)))
//!     .build()?;
//! ```

pub mod builder;

pub use self::builder::{BuildError, Builder};

use std::sync::Arc;

use tracing::trace;

pub type InstanceFactory<I, O> = Arc<dyn Fn(Option<&O>) -> I + Send + Sync>;
pub type Transformer<T, O> = Arc<dyn Fn(T, Option<&O>) -> T + Send + Sync>;
pub type Finalizer<I, T> = Arc<dyn Fn(I) -> T + Send + Sync>;
pub type OptionsProvider<O> = Arc<dyn Fn() -> Option<O> + Send + Sync>;

/// An ordered sequence of transformers over one type.
pub struct Line<T, O> {
    transformers: Vec<Transformer<T, O>>,
}

impl<T, O> Line<T, O> {
    pub fn new(transformers: Vec<Transformer<T, O>>) -> Self {
        Self { transformers }
    }

    /// Thread `input` through every transformer in order.
    pub fn push(&self, input: T, options: Option<&O>) -> T {
        self.transformers
            .iter()
            .fold(input, |current, transformer| transformer(current, options))
    }

    pub fn transformers(&self) -> &[Transformer<T, O>] {
        &self.transformers
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl<T, O> Clone for Line<T, O> {
    fn clone(&self) -> Self {
        Self {
            transformers: self.transformers.clone(),
        }
    }
}

impl<T, O> Default for Line<T, O> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Immutable construction template. See the module docs for the stages.
pub struct Assembly<I, T, O> {
    default_options: Option<OptionsProvider<O>>,
    instance_factory: InstanceFactory<I, O>,
    intermediate_line: Line<I, O>,
    finalizer: Finalizer<I, T>,
    result_line: Line<T, O>,
}

impl<I, T, O> Clone for Assembly<I, T, O> {
    fn clone(&self) -> Self {
        Self {
            default_options: self.default_options.clone(),
            instance_factory: Arc::clone(&self.instance_factory),
            intermediate_line: self.intermediate_line.clone(),
            finalizer: Arc::clone(&self.finalizer),
            result_line: self.result_line.clone(),
        }
    }
}

impl<I, T, O> Assembly<I, T, O> {
    pub fn builder() -> Builder<I, T, O> {
        Builder::new()
    }

    /// Options from the default provider, if there is one and it yields any.
    pub fn default_options(&self) -> Option<O> {
        self.default_options.as_ref().and_then(|provider| provider())
    }

    /// Build with the default options.
    pub fn build(&self) -> T {
        let options = self.default_options();
        self.build_from(options.as_ref())
    }

    pub fn build_with(&self, options: &O) -> T {
        self.build_from(Some(options))
    }

    /// Build with explicit, possibly absent, options. The default provider is
    /// not consulted.
    pub fn build_from(&self, options: Option<&O>) -> T {
        let intermediate = (self.instance_factory)(options);
        let intermediate = self.intermediate_line.push(intermediate, options);
        let result = (self.finalizer)(intermediate);
        let result = self.result_line.push(result, options);
        trace!(
            intermediate_transformers = self.intermediate_line.len(),
            result_transformers = self.result_line.len(),
            has_options = options.is_some(),
            "assembly built"
        );
        result
    }

    pub fn intermediate_line(&self) -> &Line<I, O> {
        &self.intermediate_line
    }

    pub fn result_line(&self) -> &Line<T, O> {
        &self.result_line
    }

    /// Reopen as a builder holding copies of every stage.
    pub fn to_builder(&self) -> Builder<I, T, O> {
        Builder::from_parts(
            self.default_options.clone(),
            Some(Arc::clone(&self.instance_factory)),
            self.intermediate_line.transformers.clone(),
            Some(Arc::clone(&self.finalizer)),
            self.result_line.transformers.clone(),
        )
    }

    pub(crate) fn from_parts(
        default_options: Option<OptionsProvider<O>>,
        instance_factory: InstanceFactory<I, O>,
        intermediate_line: Line<I, O>,
        finalizer: Finalizer<I, T>,
        result_line: Line<T, O>,
    ) -> Self {
        Self {
            default_options,
            instance_factory,
            intermediate_line,
            finalizer,
            result_line,
        }
    }
}
