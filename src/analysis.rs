//! Emitted-size estimation and scope-lock detection.
//!
//! Before generating a resolution routine for a plan, the code generator asks
//! two questions:
//!
//! - roughly how much code will this plan emit, so the output buffer can be
//!   presized instead of grown repeatedly;
//! - does any node of the plan cache an instance per scope, in which case the
//!   routine must take the scope lock around lazy scoped creation.
//!
//! [`CallSiteAnalyzer`] answers both in one walk. Each call site contributes a
//! base cost from an [`EmitCostTable`] and is merged with the analysis of its
//! children; a scoped call site anywhere in the tree sets the lock flag for
//! the whole tree.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_callsite::{analyze, CallSite, key_of_type};
//!
//! struct RequestContext;
//! struct Handler;
//!
//! let plan = CallSite::constructor(
//!     key_of_type::<Handler>(),
//!     "Handler",
//!     vec![
//!         CallSite::scoped(
//!             key_of_type::<RequestContext>(),
//!             CallSite::constant_value(RequestContext),
//!         ),
//!         CallSite::factory(key_of_type::<u32>(), || std::sync::Arc::new(7u32)),
//!     ],
//! );
//!
//! let info = analyze(&plan);
//! assert_eq!(info.estimated_size, 6 + 64 + 4 + 16);
//! assert!(info.requires_scope_lock);
//! ```

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Instant;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::call_site::{
    CallSite, CallSiteKind, ConstantCallSite, ConstructorCallSite, CreateInstanceCallSite,
    EnumerableCallSite, FactoryCallSite, ScopedCallSite, ServiceProviderCallSite,
    ServiceScopeFactoryCallSite, SingletonCallSite, TransientCallSite,
};
use crate::key::Key;
use crate::observer::AnalysisObserver;
use crate::visitor::CallSiteVisitor;

/// What the code generator needs to know about a plan before emitting it.
///
/// Forms a commutative monoid under [`add`](AnalysisResult::add) with
/// [`ZERO`](AnalysisResult::ZERO) as identity, so results of children can be
/// folded in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "graph-export", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisResult {
    /// Estimated size of the emitted code; a presizing hint, not a bound
    pub estimated_size: usize,
    /// True if the plan creates scoped instances and needs the scope lock
    pub requires_scope_lock: bool,
}

impl AnalysisResult {
    /// Identity of [`add`](AnalysisResult::add).
    pub const ZERO: AnalysisResult = AnalysisResult { estimated_size: 0, requires_scope_lock: false };

    pub const fn new(estimated_size: usize, requires_scope_lock: bool) -> Self {
        Self { estimated_size, requires_scope_lock }
    }

    /// A result carrying only a size.
    pub const fn sized(estimated_size: usize) -> Self {
        Self::new(estimated_size, false)
    }

    /// Sums sizes and ORs the lock flags.
    ///
    /// Sizes saturate at `usize::MAX`; with a sane cost table that is never
    /// reached, with an absurd one the hint is simply "huge".
    pub const fn add(self, other: AnalysisResult) -> AnalysisResult {
        AnalysisResult {
            estimated_size: self.estimated_size.saturating_add(other.estimated_size),
            requires_scope_lock: self.requires_scope_lock || other.requires_scope_lock,
        }
    }
}

impl Add for AnalysisResult {
    type Output = AnalysisResult;

    fn add(self, other: AnalysisResult) -> AnalysisResult {
        AnalysisResult::add(self, other)
    }
}

impl AddAssign for AnalysisResult {
    fn add_assign(&mut self, other: AnalysisResult) {
        *self = AnalysisResult::add(*self, other);
    }
}

impl Sum for AnalysisResult {
    fn sum<I: Iterator<Item = AnalysisResult>>(iter: I) -> Self {
        iter.fold(AnalysisResult::ZERO, AnalysisResult::add)
    }
}

impl<'a> Sum<&'a AnalysisResult> for AnalysisResult {
    fn sum<I: Iterator<Item = &'a AnalysisResult>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Base emitted-size cost per call-site construct.
///
/// The defaults are averages measured against one particular backend; they
/// are a calibration, not part of the algorithm. A different generator
/// should measure its own numbers and plug them in here (or load them, see
/// [`EmitCostTable::from_env`]).
///
/// Transient and singleton wrappers have no entry: they add nothing beyond
/// their inner plan.
///
/// # Examples
///
/// ```rust
/// use ferrous_callsite::{CallSiteKind, EmitCostTable};
///
/// let costs = EmitCostTable::default().with_scoped(80);
/// assert_eq!(costs.base_cost(CallSiteKind::Scoped), 80);
/// assert_eq!(costs.base_cost(CallSiteKind::CreateInstance), 6);
/// assert_eq!(costs.base_cost(CallSiteKind::Singleton), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EmitCostTable {
    /// Constructor calls, create-instance sites and collection construction
    pub constructor: usize,
    /// Scope cache lookup, lock and store around the inner plan
    pub scoped: usize,
    /// Loading a constant, also used for the scope factory handle
    pub constant: usize,
    /// Loading the resolver itself
    pub service_provider: usize,
    /// Invoking a user factory
    pub factory: usize,
}

impl EmitCostTable {
    /// The stock calibration.
    pub const DEFAULT: EmitCostTable = EmitCostTable {
        constructor: 6,
        scoped: 64,
        constant: 4,
        service_provider: 1,
        factory: 16,
    };

    /// Base cost of one call site of `kind`, excluding its children.
    pub const fn base_cost(&self, kind: CallSiteKind) -> usize {
        match kind {
            CallSiteKind::Transient => 0,
            CallSiteKind::Singleton => 0,
            CallSiteKind::Constructor => self.constructor,
            CallSiteKind::CreateInstance => self.constructor,
            CallSiteKind::Enumerable => self.constructor,
            CallSiteKind::Scoped => self.scoped,
            CallSiteKind::Constant => self.constant,
            CallSiteKind::ServiceScopeFactory => self.constant,
            CallSiteKind::ServiceProvider => self.service_provider,
            CallSiteKind::Factory => self.factory,
        }
    }

    pub const fn with_constructor(mut self, cost: usize) -> Self {
        self.constructor = cost;
        self
    }

    pub const fn with_scoped(mut self, cost: usize) -> Self {
        self.scoped = cost;
        self
    }

    pub const fn with_constant(mut self, cost: usize) -> Self {
        self.constant = cost;
        self
    }

    pub const fn with_service_provider(mut self, cost: usize) -> Self {
        self.service_provider = cost;
        self
    }

    pub const fn with_factory(mut self, cost: usize) -> Self {
        self.factory = cost;
        self
    }
}

impl Default for EmitCostTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Argument threaded through an analysis walk.
///
/// Carries the optional observer and the depth of the node being visited
/// (the root is depth 0). Plain analysis uses [`AnalysisContext::root`].
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    observer: Option<&'a dyn AnalysisObserver>,
    depth: usize,
}

impl<'a> AnalysisContext<'a> {
    /// Context for an unobserved walk starting at the root.
    pub const fn root() -> Self {
        Self { observer: None, depth: 0 }
    }

    /// Context for a walk reporting every visited node to `observer`.
    pub fn observed(observer: &'a dyn AnalysisObserver) -> Self {
        Self { observer: Some(observer), depth: 0 }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn descend(self) -> Self {
        Self { depth: self.depth + 1, ..self }
    }

    #[inline]
    fn visiting(&self, kind: CallSiteKind, service: &Key) {
        if let Some(observer) = self.observer {
            observer.visiting(kind, service, self.depth);
        }
    }
}

impl std::fmt::Debug for AnalysisContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("observed", &self.observer.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

/// Walks a plan and computes its [`AnalysisResult`].
///
/// The analyzer is a `Copy` value holding only its cost table. It has no
/// mutable state, so one instance (typically [`CallSiteAnalyzer::INSTANCE`])
/// can serve any number of threads analyzing shared or separate plans.
///
/// # Examples
///
/// ```rust
/// use ferrous_callsite::{CallSite, CallSiteAnalyzer, EmitCostTable, key_of_type};
///
/// struct Cache;
///
/// let plan = CallSite::scoped(key_of_type::<Cache>(), CallSite::create_instance(key_of_type::<Cache>(), "Cache"));
///
/// let stock = CallSiteAnalyzer::INSTANCE.analyze(&plan);
/// assert_eq!((stock.estimated_size, stock.requires_scope_lock), (70, true));
///
/// let tuned = CallSiteAnalyzer::with_costs(EmitCostTable::default().with_scoped(40));
/// assert_eq!(tuned.analyze(&plan).estimated_size, 46);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSiteAnalyzer {
    costs: EmitCostTable,
}

impl CallSiteAnalyzer {
    /// Shared analyzer using the stock calibration.
    pub const INSTANCE: CallSiteAnalyzer = CallSiteAnalyzer { costs: EmitCostTable::DEFAULT };

    pub const fn new() -> Self {
        Self::INSTANCE
    }

    pub const fn with_costs(costs: EmitCostTable) -> Self {
        Self { costs }
    }

    pub fn costs(&self) -> &EmitCostTable {
        &self.costs
    }

    /// Analyzes the plan rooted at `call_site`.
    pub fn analyze(&self, call_site: &CallSite) -> AnalysisResult {
        self.visit_call_site(call_site, AnalysisContext::root())
    }

    /// Same as [`analyze`](Self::analyze); named for the code generator's
    /// point of view.
    pub fn collect_generation_info(&self, call_site: &CallSite) -> AnalysisResult {
        self.analyze(call_site)
    }

    /// Analyzes the plan while reporting each visited node and the final
    /// result to `observer`. The result is identical to [`analyze`](Self::analyze).
    pub fn analyze_observed(&self, call_site: &CallSite, observer: &dyn AnalysisObserver) -> AnalysisResult {
        let start = Instant::now();
        let result = self.visit_call_site(call_site, AnalysisContext::observed(observer));
        observer.analyzed(call_site.service(), &result, start.elapsed());
        result
    }

    fn base(&self, kind: CallSiteKind) -> AnalysisResult {
        AnalysisResult::sized(self.costs.base_cost(kind))
    }

    fn merge_children(&self, base: AnalysisResult, children: &[CallSite], ctx: AnalysisContext<'_>) -> AnalysisResult {
        let ctx = ctx.descend();
        children
            .iter()
            .fold(base, |acc, child| acc + self.visit_call_site(child, ctx))
    }
}

impl<'a> CallSiteVisitor<AnalysisContext<'a>, AnalysisResult> for CallSiteAnalyzer {
    fn visit_transient(&self, site: &TransientCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Transient, site.service());
        self.merge_children(self.base(CallSiteKind::Transient), std::slice::from_ref(site.inner()), ctx)
    }

    fn visit_constructor(&self, site: &ConstructorCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Constructor, site.service());
        self.merge_children(self.base(CallSiteKind::Constructor), site.parameters(), ctx)
    }

    fn visit_singleton(&self, site: &SingletonCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Singleton, site.service());
        self.merge_children(self.base(CallSiteKind::Singleton), std::slice::from_ref(site.inner()), ctx)
    }

    fn visit_scoped(&self, site: &ScopedCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Scoped, site.service());
        let base = AnalysisResult::new(self.costs.base_cost(CallSiteKind::Scoped), true);
        self.merge_children(base, std::slice::from_ref(site.inner()), ctx)
    }

    fn visit_constant(&self, site: &ConstantCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Constant, site.service());
        self.base(CallSiteKind::Constant)
    }

    fn visit_create_instance(&self, site: &CreateInstanceCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::CreateInstance, site.service());
        self.base(CallSiteKind::CreateInstance)
    }

    fn visit_service_provider(&self, site: &ServiceProviderCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::ServiceProvider, site.service());
        self.base(CallSiteKind::ServiceProvider)
    }

    fn visit_service_scope_factory(&self, site: &ServiceScopeFactoryCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::ServiceScopeFactory, site.service());
        self.base(CallSiteKind::ServiceScopeFactory)
    }

    fn visit_enumerable(&self, site: &EnumerableCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Enumerable, site.service());
        self.merge_children(self.base(CallSiteKind::Enumerable), site.elements(), ctx)
    }

    fn visit_factory(&self, site: &FactoryCallSite, ctx: AnalysisContext<'a>) -> AnalysisResult {
        ctx.visiting(CallSiteKind::Factory, site.service());
        self.base(CallSiteKind::Factory)
    }
}

/// Analyzes `call_site` with the stock calibration.
pub fn analyze(call_site: &CallSite) -> AnalysisResult {
    CallSiteAnalyzer::INSTANCE.analyze(call_site)
}
