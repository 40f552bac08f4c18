//! coldlib-core
//!
//! Value containers, tri-state outcomes, callbacks and staged assembly.
//!
//! # モジュール構成
//! - **container**: mutability 契約を持つ値セルとデコレータ
//!   (protect, forking, awaitable, lazy, mapped)
//! - **outcome**: success / unset / failed の結果と `attempt` ヘルパー
//! - **callback**: mono / multi ディスパッチ（one-shot future で待機可能）
//! - **assembly**: factory → intermediate line → finalizer → result line
//! - **registry**: awaitable コンテナで公開されるシングルトンサービス
//! - **pending**: すべての `await` が返す future
//! - **error**: `ColdError` と型消去された `Failure`

pub mod assembly;
pub mod callback;
pub mod container;
pub mod error;
pub mod outcome;
pub mod pending;
pub mod registry;

pub use assembly::{Assembly, BuildError, Builder};
pub use callback::{Callback, HandlerResult, MonoCallback, MultiCallback};
pub use container::{Caller, Container, ContainerRef, Mutability, Value};
pub use error::{ColdError, Failure};
pub use outcome::{Outcome, attempt};
pub use pending::Pending;
pub use registry::{RegistryConfig, RegistryError, Service, ServiceRegistry};
