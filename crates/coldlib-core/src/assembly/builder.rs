//! Builder - Assembly の構築
//!
//! `build` は必須ステージ（instance factory と finalizer）を検証し、
//! 独立したスナップショットを返す。ビルド後も同じ Builder にステージを追加できる。

use std::sync::Arc;

use super::{Assembly, Finalizer, InstanceFactory, Line, OptionsProvider, Transformer};

/// Builder は [`Assembly`] のステージを蓄積する
///
/// # Example
/// ```ignore
/// let assembly = Builder::<Vec<u8>, String, ()>::new()
///     .instance_factory(|_| Vec::new())
///     .add_intermediate_consumer(|bytes, _| bytes.extend_from_slice(b"hi"))
///     .finalizer(|bytes| String::from_utf8_lossy(&bytes).into_owned())
///     .build()?;
/// ```
pub struct Builder<I, T, O> {
    default_options: Option<OptionsProvider<O>>,
    instance_factory: Option<InstanceFactory<I, O>>,
    intermediate: Vec<Transformer<I, O>>,
    finalizer: Option<Finalizer<I, T>>,
    result: Vec<Transformer<T, O>>,
}

/// BuildError は Assembly 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("assembly has no instance factory")]
    MissingInstanceFactory,
    #[error("assembly has no finalizer")]
    MissingFinalizer,
}

impl<I, T, O> Builder<I, T, O> {
    /// 新しい Builder を作成
    pub fn new() -> Self {
        Self {
            default_options: None,
            instance_factory: None,
            intermediate: Vec::new(),
            finalizer: None,
            result: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        default_options: Option<OptionsProvider<O>>,
        instance_factory: Option<InstanceFactory<I, O>>,
        intermediate: Vec<Transformer<I, O>>,
        finalizer: Option<Finalizer<I, T>>,
        result: Vec<Transformer<T, O>>,
    ) -> Self {
        Self {
            default_options,
            instance_factory,
            intermediate,
            finalizer,
            result,
        }
    }

    pub fn instance_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Option<&O>) -> I + Send + Sync + 'static,
    {
        self.instance_factory = Some(Arc::new(factory));
        self
    }

    /// Consulted by `Assembly::build` on every call.
    pub fn default_options_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Option<O> + Send + Sync + 'static,
    {
        self.default_options = Some(Arc::new(provider));
        self
    }

    pub fn default_options(self, options: O) -> Self
    where
        O: Clone + Send + Sync + 'static,
    {
        self.default_options_provider(move || Some(options.clone()))
    }

    pub fn add_intermediate_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(I, Option<&O>) -> I + Send + Sync + 'static,
    {
        self.intermediate.push(Arc::new(transformer));
        self
    }

    /// In-place variant of [`add_intermediate_transformer`](Self::add_intermediate_transformer).
    pub fn add_intermediate_consumer<F>(self, consumer: F) -> Self
    where
        F: Fn(&mut I, Option<&O>) + Send + Sync + 'static,
    {
        self.add_intermediate_transformer(move |mut intermediate, options| {
            consumer(&mut intermediate, options);
            intermediate
        })
    }

    pub fn finalizer<F>(mut self, finalizer: F) -> Self
    where
        F: Fn(I) -> T + Send + Sync + 'static,
    {
        self.finalizer = Some(Arc::new(finalizer));
        self
    }

    pub fn add_result_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(T, Option<&O>) -> T + Send + Sync + 'static,
    {
        self.result.push(Arc::new(transformer));
        self
    }

    pub fn add_result_consumer<F>(self, consumer: F) -> Self
    where
        F: Fn(&mut T, Option<&O>) + Send + Sync + 'static,
    {
        self.add_result_transformer(move |mut result, options| {
            consumer(&mut result, options);
            result
        })
    }

    /// 現在のステージから [`Assembly`] を構築
    ///
    /// # Errors
    /// - [`BuildError::MissingInstanceFactory`] without an instance factory
    /// - [`BuildError::MissingFinalizer`] without a finalizer
    pub fn build(&self) -> Result<Assembly<I, T, O>, BuildError> {
        let instance_factory = self
            .instance_factory
            .clone()
            .ok_or(BuildError::MissingInstanceFactory)?;
        let finalizer = self.finalizer.clone().ok_or(BuildError::MissingFinalizer)?;
        Ok(Assembly::from_parts(
            self.default_options.clone(),
            instance_factory,
            Line::new(self.intermediate.clone()),
            finalizer,
            Line::new(self.result.clone()),
        ))
    }
}

impl<T, O> Builder<T, T, O> {
    /// Use the intermediate value as the result unchanged.
    pub fn identity_finalizer(self) -> Self {
        self.finalizer(|value| value)
    }
}

impl<I, T, O> Default for Builder<I, T, O> {
    fn default() -> Self {
        Self::new()
    }
}
