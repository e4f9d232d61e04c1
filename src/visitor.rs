//! Double-dispatch traversal over call-site plans.
//!
//! [`CallSiteVisitor`] routes a [`CallSite`] to the `visit_*` method for its
//! variant, threading a caller-chosen argument `A` and returning a
//! caller-chosen result `R`. The dispatch itself is one exhaustive `match`
//! shared by every pass; it does not recurse. Each pass decides whether and
//! how to descend by calling [`CallSiteVisitor::visit_call_site`] on the
//! children it cares about.
//!
//! # Examples
//!
//! Counting constructor invocations in a plan:
//!
//! ```rust
//! use ferrous_callsite::*;
//!
//! struct ConstructorCounter;
//!
//! impl CallSiteVisitor<(), usize> for ConstructorCounter {
//!     fn visit_transient(&self, site: &TransientCallSite, arg: ()) -> usize {
//!         self.visit_call_site(site.inner(), arg)
//!     }
//!     fn visit_constructor(&self, site: &ConstructorCallSite, arg: ()) -> usize {
//!         1 + site.parameters().iter().map(|p| self.visit_call_site(p, arg)).sum::<usize>()
//!     }
//!     fn visit_singleton(&self, site: &SingletonCallSite, arg: ()) -> usize {
//!         self.visit_call_site(site.inner(), arg)
//!     }
//!     fn visit_scoped(&self, site: &ScopedCallSite, arg: ()) -> usize {
//!         self.visit_call_site(site.inner(), arg)
//!     }
//!     fn visit_constant(&self, _: &ConstantCallSite, _: ()) -> usize { 0 }
//!     fn visit_create_instance(&self, _: &CreateInstanceCallSite, _: ()) -> usize { 1 }
//!     fn visit_service_provider(&self, _: &ServiceProviderCallSite, _: ()) -> usize { 0 }
//!     fn visit_service_scope_factory(&self, _: &ServiceScopeFactoryCallSite, _: ()) -> usize { 0 }
//!     fn visit_enumerable(&self, site: &EnumerableCallSite, arg: ()) -> usize {
//!         site.elements().iter().map(|e| self.visit_call_site(e, arg)).sum()
//!     }
//!     fn visit_factory(&self, _: &FactoryCallSite, _: ()) -> usize { 0 }
//! }
//!
//! struct A;
//! struct B;
//! let plan = CallSite::constructor(
//!     key_of_type::<A>(),
//!     "A",
//!     vec![CallSite::create_instance(key_of_type::<B>(), "B")],
//! );
//! assert_eq!(ConstructorCounter.visit_call_site(&plan, ()), 2);
//! ```

use crate::call_site::{
    CallSite, ConstantCallSite, ConstructorCallSite, CreateInstanceCallSite, EnumerableCallSite,
    FactoryCallSite, ScopedCallSite, ServiceProviderCallSite, ServiceScopeFactoryCallSite,
    SingletonCallSite, TransientCallSite,
};

/// A pass over call-site plans.
///
/// Implementors provide one rule per call-site variant. None of the rules
/// has a default: a new variant must be handled by every pass before the
/// crate compiles again.
///
/// Receivers are `&self` so a visitor without state can be shared freely
/// across threads; passes that accumulate do so through `A`, through `R`, or
/// through interior state they own.
pub trait CallSiteVisitor<A, R> {
    /// Dispatches `call_site` to the rule for its variant.
    fn visit_call_site(&self, call_site: &CallSite, argument: A) -> R {
        match call_site {
            CallSite::Transient(site) => self.visit_transient(site, argument),
            CallSite::Constructor(site) => self.visit_constructor(site, argument),
            CallSite::Singleton(site) => self.visit_singleton(site, argument),
            CallSite::Scoped(site) => self.visit_scoped(site, argument),
            CallSite::Constant(site) => self.visit_constant(site, argument),
            CallSite::CreateInstance(site) => self.visit_create_instance(site, argument),
            CallSite::ServiceProvider(site) => self.visit_service_provider(site, argument),
            CallSite::ServiceScopeFactory(site) => self.visit_service_scope_factory(site, argument),
            CallSite::Enumerable(site) => self.visit_enumerable(site, argument),
            CallSite::Factory(site) => self.visit_factory(site, argument),
        }
    }

    fn visit_transient(&self, site: &TransientCallSite, argument: A) -> R;

    fn visit_constructor(&self, site: &ConstructorCallSite, argument: A) -> R;

    fn visit_singleton(&self, site: &SingletonCallSite, argument: A) -> R;

    fn visit_scoped(&self, site: &ScopedCallSite, argument: A) -> R;

    fn visit_constant(&self, site: &ConstantCallSite, argument: A) -> R;

    fn visit_create_instance(&self, site: &CreateInstanceCallSite, argument: A) -> R;

    fn visit_service_provider(&self, site: &ServiceProviderCallSite, argument: A) -> R;

    fn visit_service_scope_factory(&self, site: &ServiceScopeFactoryCallSite, argument: A) -> R;

    fn visit_enumerable(&self, site: &EnumerableCallSite, argument: A) -> R;

    fn visit_factory(&self, site: &FactoryCallSite, argument: A) -> R;
}
