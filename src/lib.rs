//! # ferrous-callsite
//!
//! Call-site plan analysis for ferrous-di code generation.
//!
//! A resolution plan is a tree of [`CallSite`]s describing how to build a
//! service: constructor calls with parameter plans, singleton and scoped
//! caches around inner plans, constants, factories, collections. Before a
//! generator emits a resolution routine for a plan, it needs two facts:
//!
//! - an **estimated size** of the emitted code, to presize its buffer;
//! - whether the plan **requires the scope lock**, i.e. whether any node
//!   caches an instance per scope and so needs synchronized lazy creation.
//!
//! [`CallSiteAnalyzer`] computes both in one walk.
//!
//! ## Features
//!
//! - **Closed plan model**: ten call-site variants, matched exhaustively everywhere
//! - **Reusable traversal**: [`CallSiteVisitor`] double dispatch with caller-chosen argument and result
//! - **Stateless analyzer**: `Copy`, `Send + Sync`, shareable as [`CallSiteAnalyzer::INSTANCE`]
//! - **Tunable calibration**: [`EmitCostTable`] from code, environment, or JSON (`config` feature)
//! - **Diagnostics**: [`AnalysisObserver`] hooks and plan graph export (DOT, Mermaid, JSON, YAML)
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_callsite::{analyze, CallSite, key_of_type};
//!
//! struct Database;
//! struct RequestContext;
//! struct UserService;
//!
//! // UserService::new(db, ctx) with a singleton database and a scoped context
//! let plan = CallSite::transient(
//!     key_of_type::<UserService>(),
//!     CallSite::constructor(
//!         key_of_type::<UserService>(),
//!         "UserService",
//!         vec![
//!             CallSite::singleton(
//!                 key_of_type::<Database>(),
//!                 CallSite::create_instance(key_of_type::<Database>(), "Database"),
//!             ),
//!             CallSite::scoped(
//!                 key_of_type::<RequestContext>(),
//!                 CallSite::create_instance(key_of_type::<RequestContext>(), "RequestContext"),
//!             ),
//!         ],
//!     ),
//! );
//!
//! let info = analyze(&plan);
//! assert_eq!(info.estimated_size, 6 + 6 + 64 + 6);
//! assert!(info.requires_scope_lock);
//! ```
//!
//! ## Writing Another Pass
//!
//! Any pass over plans implements [`CallSiteVisitor`] and recurses by calling
//! [`CallSiteVisitor::visit_call_site`] on the children it wants. See the
//! [`visitor`] module docs for a complete example, and [`graph_export`] for a
//! pass that flattens plans into graphs.

pub mod analysis;
pub mod call_site;
pub mod config;
pub mod error;
pub mod graph_export;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod visitor;

// Re-export core types
pub use analysis::{analyze, AnalysisContext, AnalysisResult, CallSiteAnalyzer, EmitCostTable};
pub use call_site::{
    CallSite, CallSiteKind, ConstantCallSite, ConstructorCallSite, CreateInstanceCallSite,
    EnumerableCallSite, FactoryCallSite, FactoryFn, ScopedCallSite, ServiceInstance,
    ServiceProviderCallSite, ServiceScopeFactoryCallSite, SingletonCallSite, TransientCallSite,
};
pub use error::{CallSiteError, CallSiteResult};
pub use graph_export::{ExportFormat, PlanGraph};
pub use key::{key_of_trait, key_of_type, Key};
pub use lifetime::Lifetime;
pub use observer::{AnalysisObserver, LoggingObserver, NoopObserver};
pub use visitor::CallSiteVisitor;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Database;
    struct Handler;

    #[test]
    fn test_analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Copy>() {}
        assert_send_sync::<CallSiteAnalyzer>();
        assert_eq!(std::mem::size_of::<CallSiteAnalyzer>(), std::mem::size_of::<EmitCostTable>());
    }

    #[test]
    fn test_free_function_uses_stock_table() {
        let plan = CallSite::constructor(
            key_of_type::<Handler>(),
            "Handler",
            vec![
                CallSite::singleton(key_of_type::<Database>(), CallSite::factory(key_of_type::<Database>(), || Arc::new(Database))),
                CallSite::service_scope_factory(key_of_type::<Handler>()),
            ],
        );
        assert_eq!(analyze(&plan), CallSiteAnalyzer::INSTANCE.analyze(&plan));
        assert_eq!(analyze(&plan), AnalysisResult::new(6 + 16 + 4, false));
    }
}
