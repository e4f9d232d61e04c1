//! Call-site plan model.
//!
//! A call site is one instruction in a resolution plan: "call this constructor
//! with these parameter plans", "cache the inner plan per scope", "return this
//! constant". The plan for a service is a tree of call sites, built once by
//! the container's catalog and then only read.
//!
//! The set of call sites is closed. [`CallSite`] is a plain enum and every
//! traversal matches on it exhaustively, so adding a variant is a compile
//! error in each pass until that pass handles it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::{key_of_type, Key};
use crate::lifetime::Lifetime;

/// Type-erased service instance, as held by constant call sites.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Caller-supplied factory invoked by a factory call site.
pub type FactoryFn = Arc<dyn Fn() -> ServiceInstance + Send + Sync>;

/// One node of a resolution plan.
///
/// # Examples
///
/// ```rust
/// use ferrous_callsite::{CallSite, CallSiteKind, key_of_type};
///
/// struct Config;
/// struct Database;
///
/// // Database::new(config), cached for the process
/// let plan = CallSite::singleton(
///     key_of_type::<Database>(),
///     CallSite::constructor(
///         key_of_type::<Database>(),
///         "Database",
///         vec![CallSite::constant_value(Config)],
///     ),
/// );
///
/// assert_eq!(plan.kind(), CallSiteKind::Singleton);
/// assert_eq!(plan.children().len(), 1);
/// assert_eq!(plan.node_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub enum CallSite {
    /// Fresh instance on every resolution
    Transient(TransientCallSite),
    /// Constructor invocation with resolved parameters
    Constructor(ConstructorCallSite),
    /// Process-lifetime cached instance
    Singleton(SingletonCallSite),
    /// Per-scope cached instance
    Scoped(ScopedCallSite),
    /// Precomputed value
    Constant(ConstantCallSite),
    /// Constructor-equivalent creation without an inner plan
    CreateInstance(CreateInstanceCallSite),
    /// The resolver itself
    ServiceProvider(ServiceProviderCallSite),
    /// A handle that creates new scopes
    ServiceScopeFactory(ServiceScopeFactoryCallSite),
    /// A collection resolved element by element
    Enumerable(EnumerableCallSite),
    /// Caller-supplied factory
    Factory(FactoryCallSite),
}

/// Fieldless tag mirroring the [`CallSite`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "graph-export", derive(serde::Serialize, serde::Deserialize))]
pub enum CallSiteKind {
    Transient,
    Constructor,
    Singleton,
    Scoped,
    Constant,
    CreateInstance,
    ServiceProvider,
    ServiceScopeFactory,
    Enumerable,
    Factory,
}

impl CallSiteKind {
    /// Every kind, in declaration order.
    pub const ALL: [CallSiteKind; 10] = [
        CallSiteKind::Transient,
        CallSiteKind::Constructor,
        CallSiteKind::Singleton,
        CallSiteKind::Scoped,
        CallSiteKind::Constant,
        CallSiteKind::CreateInstance,
        CallSiteKind::ServiceProvider,
        CallSiteKind::ServiceScopeFactory,
        CallSiteKind::Enumerable,
        CallSiteKind::Factory,
    ];

    /// Short label used in logs and graph exports.
    pub fn as_str(self) -> &'static str {
        match self {
            CallSiteKind::Transient => "Transient",
            CallSiteKind::Constructor => "Constructor",
            CallSiteKind::Singleton => "Singleton",
            CallSiteKind::Scoped => "Scoped",
            CallSiteKind::Constant => "Constant",
            CallSiteKind::CreateInstance => "CreateInstance",
            CallSiteKind::ServiceProvider => "ServiceProvider",
            CallSiteKind::ServiceScopeFactory => "ServiceScopeFactory",
            CallSiteKind::Enumerable => "Enumerable",
            CallSiteKind::Factory => "Factory",
        }
    }

    /// True for kinds that never have children.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            CallSiteKind::Constant
                | CallSiteKind::CreateInstance
                | CallSiteKind::ServiceProvider
                | CallSiteKind::ServiceScopeFactory
                | CallSiteKind::Factory
        )
    }
}

impl fmt::Display for CallSiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces a fresh instance from the inner plan on every resolution.
#[derive(Debug, Clone)]
pub struct TransientCallSite {
    service: Key,
    inner: Box<CallSite>,
}

impl TransientCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn inner(&self) -> &CallSite {
        &self.inner
    }
}

/// Invokes a constructor, one parameter plan per argument.
#[derive(Debug, Clone)]
pub struct ConstructorCallSite {
    service: Key,
    implementation: &'static str,
    parameters: Vec<CallSite>,
}

impl ConstructorCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    /// Name of the implementation type whose constructor is called.
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    /// Parameter plans, in argument order.
    pub fn parameters(&self) -> &[CallSite] {
        &self.parameters
    }
}

/// Caches the inner plan's instance for the lifetime of the root provider.
#[derive(Debug, Clone)]
pub struct SingletonCallSite {
    service: Key,
    inner: Box<CallSite>,
}

impl SingletonCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn inner(&self) -> &CallSite {
        &self.inner
    }
}

/// Caches the inner plan's instance once per scope.
#[derive(Debug, Clone)]
pub struct ScopedCallSite {
    service: Key,
    inner: Box<CallSite>,
}

impl ScopedCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn inner(&self) -> &CallSite {
        &self.inner
    }
}

/// Returns a value computed before the plan was built.
#[derive(Clone)]
pub struct ConstantCallSite {
    service: Key,
    value: ServiceInstance,
}

impl ConstantCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn value(&self) -> &ServiceInstance {
        &self.value
    }

    /// Borrows the constant as `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ConstantCallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantCallSite")
            .field("service", &self.service)
            .field("value", &"<instance>")
            .finish()
    }
}

/// Creates an instance the way a parameterless constructor would, with no
/// inner plan to resolve.
#[derive(Debug, Clone)]
pub struct CreateInstanceCallSite {
    service: Key,
    implementation: &'static str,
}

impl CreateInstanceCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }
}

/// Returns the resolver that is running the plan.
#[derive(Debug, Clone)]
pub struct ServiceProviderCallSite {
    service: Key,
}

impl ServiceProviderCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }
}

/// Returns a handle able to create new scopes.
#[derive(Debug, Clone)]
pub struct ServiceScopeFactoryCallSite {
    service: Key,
}

impl ServiceScopeFactoryCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }
}

/// Resolves every registered implementation of an item service into a
/// collection.
#[derive(Debug, Clone)]
pub struct EnumerableCallSite {
    service: Key,
    item_service: Key,
    elements: Vec<CallSite>,
}

impl EnumerableCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    /// Key of the element service.
    pub fn item_service(&self) -> &Key {
        &self.item_service
    }

    /// Element plans, in registration order. May be empty.
    pub fn elements(&self) -> &[CallSite] {
        &self.elements
    }
}

/// Invokes a caller-supplied factory.
#[derive(Clone)]
pub struct FactoryCallSite {
    service: Key,
    factory: FactoryFn,
}

impl FactoryCallSite {
    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn factory(&self) -> &FactoryFn {
        &self.factory
    }

    /// Runs the factory.
    pub fn invoke(&self) -> ServiceInstance {
        (self.factory)()
    }
}

impl fmt::Debug for FactoryCallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryCallSite")
            .field("service", &self.service)
            .field("factory", &"<fn>")
            .finish()
    }
}

impl CallSite {
    /// Wraps `inner` so that every resolution gets a fresh instance.
    pub fn transient(service: Key, inner: CallSite) -> Self {
        CallSite::Transient(TransientCallSite { service, inner: Box::new(inner) })
    }

    /// Calls the constructor of `implementation` with the given parameter plans.
    pub fn constructor(service: Key, implementation: &'static str, parameters: Vec<CallSite>) -> Self {
        CallSite::Constructor(ConstructorCallSite { service, implementation, parameters })
    }

    /// Caches `inner` for the lifetime of the root provider.
    pub fn singleton(service: Key, inner: CallSite) -> Self {
        CallSite::Singleton(SingletonCallSite { service, inner: Box::new(inner) })
    }

    /// Caches `inner` once per scope.
    pub fn scoped(service: Key, inner: CallSite) -> Self {
        CallSite::Scoped(ScopedCallSite { service, inner: Box::new(inner) })
    }

    /// Returns `value` on every resolution.
    pub fn constant(service: Key, value: ServiceInstance) -> Self {
        CallSite::Constant(ConstantCallSite { service, value })
    }

    /// Constant call site keyed by the value's own type.
    pub fn constant_value<T: Any + Send + Sync>(value: T) -> Self {
        CallSite::constant(key_of_type::<T>(), Arc::new(value))
    }

    /// Creates `implementation` without resolving any parameters.
    pub fn create_instance(service: Key, implementation: &'static str) -> Self {
        CallSite::CreateInstance(CreateInstanceCallSite { service, implementation })
    }

    /// Resolves to the resolver itself.
    pub fn service_provider(service: Key) -> Self {
        CallSite::ServiceProvider(ServiceProviderCallSite { service })
    }

    /// Resolves to the scope factory.
    pub fn service_scope_factory(service: Key) -> Self {
        CallSite::ServiceScopeFactory(ServiceScopeFactoryCallSite { service })
    }

    /// Collects every element plan into one collection.
    pub fn enumerable(service: Key, item_service: Key, elements: Vec<CallSite>) -> Self {
        CallSite::Enumerable(EnumerableCallSite { service, item_service, elements })
    }

    /// Invokes `factory` on every resolution.
    pub fn factory<F>(service: Key, factory: F) -> Self
    where
        F: Fn() -> ServiceInstance + Send + Sync + 'static,
    {
        CallSite::Factory(FactoryCallSite { service, factory: Arc::new(factory) })
    }

    /// The variant tag.
    pub fn kind(&self) -> CallSiteKind {
        match self {
            CallSite::Transient(_) => CallSiteKind::Transient,
            CallSite::Constructor(_) => CallSiteKind::Constructor,
            CallSite::Singleton(_) => CallSiteKind::Singleton,
            CallSite::Scoped(_) => CallSiteKind::Scoped,
            CallSite::Constant(_) => CallSiteKind::Constant,
            CallSite::CreateInstance(_) => CallSiteKind::CreateInstance,
            CallSite::ServiceProvider(_) => CallSiteKind::ServiceProvider,
            CallSite::ServiceScopeFactory(_) => CallSiteKind::ServiceScopeFactory,
            CallSite::Enumerable(_) => CallSiteKind::Enumerable,
            CallSite::Factory(_) => CallSiteKind::Factory,
        }
    }

    /// Key of the service this call site produces.
    pub fn service(&self) -> &Key {
        match self {
            CallSite::Transient(site) => site.service(),
            CallSite::Constructor(site) => site.service(),
            CallSite::Singleton(site) => site.service(),
            CallSite::Scoped(site) => site.service(),
            CallSite::Constant(site) => site.service(),
            CallSite::CreateInstance(site) => site.service(),
            CallSite::ServiceProvider(site) => site.service(),
            CallSite::ServiceScopeFactory(site) => site.service(),
            CallSite::Enumerable(site) => site.service(),
            CallSite::Factory(site) => site.service(),
        }
    }

    /// Direct children in declaration order.
    ///
    /// Caching wrappers yield their single inner plan, constructors their
    /// parameters, enumerables their elements, leaves nothing.
    pub fn children(&self) -> &[CallSite] {
        match self {
            CallSite::Transient(site) => std::slice::from_ref(site.inner()),
            CallSite::Singleton(site) => std::slice::from_ref(site.inner()),
            CallSite::Scoped(site) => std::slice::from_ref(site.inner()),
            CallSite::Constructor(site) => site.parameters(),
            CallSite::Enumerable(site) => site.elements(),
            CallSite::Constant(_)
            | CallSite::CreateInstance(_)
            | CallSite::ServiceProvider(_)
            | CallSite::ServiceScopeFactory(_)
            | CallSite::Factory(_) => &[],
        }
    }

    /// Cache lifetime for the three caching wrappers, `None` otherwise.
    pub fn cache_lifetime(&self) -> Option<Lifetime> {
        match self {
            CallSite::Singleton(_) => Some(Lifetime::Singleton),
            CallSite::Scoped(_) => Some(Lifetime::Scoped),
            CallSite::Transient(_) => Some(Lifetime::Transient),
            _ => None,
        }
    }

    /// Number of call sites in this tree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(CallSite::node_count).sum::<usize>()
    }

    /// Length of the longest root-to-leaf path, counted in nodes.
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(CallSite::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_trait;

    struct Clock;
    struct Handler;
    trait Plugin {}

    #[test]
    fn test_kind_matches_variant() {
        let sites = vec![
            CallSite::transient(key_of_type::<Clock>(), CallSite::create_instance(key_of_type::<Clock>(), "Clock")),
            CallSite::constructor(key_of_type::<Handler>(), "Handler", vec![]),
            CallSite::singleton(key_of_type::<Clock>(), CallSite::create_instance(key_of_type::<Clock>(), "Clock")),
            CallSite::scoped(key_of_type::<Clock>(), CallSite::create_instance(key_of_type::<Clock>(), "Clock")),
            CallSite::constant_value(7u32),
            CallSite::create_instance(key_of_type::<Clock>(), "Clock"),
            CallSite::service_provider(key_of_trait::<dyn Plugin>()),
            CallSite::service_scope_factory(key_of_trait::<dyn Plugin>()),
            CallSite::enumerable(key_of_type::<Vec<Clock>>(), key_of_type::<Clock>(), vec![]),
            CallSite::factory(key_of_type::<u32>(), || Arc::new(1u32)),
        ];

        let kinds: Vec<_> = sites.iter().map(CallSite::kind).collect();
        assert_eq!(kinds, CallSiteKind::ALL.to_vec());
    }

    #[test]
    fn test_children_order_is_preserved() {
        let site = CallSite::constructor(
            key_of_type::<Handler>(),
            "Handler",
            vec![
                CallSite::constant_value(1u8),
                CallSite::constant_value(2u16),
                CallSite::constant_value(3u32),
            ],
        );

        let names: Vec<_> = site.children().iter().map(|c| c.service().display_name()).collect();
        assert_eq!(names, vec!["u8", "u16", "u32"]);
    }

    #[test]
    fn test_leaves_have_no_children() {
        for kind in CallSiteKind::ALL {
            if kind.is_leaf() {
                let site = match kind {
                    CallSiteKind::Constant => CallSite::constant_value(0i64),
                    CallSiteKind::CreateInstance => CallSite::create_instance(key_of_type::<Clock>(), "Clock"),
                    CallSiteKind::ServiceProvider => CallSite::service_provider(key_of_type::<Clock>()),
                    CallSiteKind::ServiceScopeFactory => CallSite::service_scope_factory(key_of_type::<Clock>()),
                    CallSiteKind::Factory => CallSite::factory(key_of_type::<Clock>(), || Arc::new(Clock)),
                    _ => unreachable!(),
                };
                assert!(site.children().is_empty(), "{} should be a leaf", kind);
            }
        }
    }

    #[test]
    fn test_constant_downcast() {
        let site = CallSite::constant_value(String::from("postgres://localhost"));
        match &site {
            CallSite::Constant(constant) => {
                assert_eq!(constant.downcast_ref::<String>().map(String::as_str), Some("postgres://localhost"));
                assert!(constant.downcast_ref::<u32>().is_none());
            }
            other => panic!("expected constant, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_factory_invoke() {
        let site = CallSite::factory(key_of_type::<u64>(), || Arc::new(99u64));
        if let CallSite::Factory(factory) = &site {
            let value = factory.invoke();
            assert_eq!(value.downcast_ref::<u64>(), Some(&99));
        } else {
            panic!("expected factory");
        }
    }

    #[test]
    fn test_cache_lifetime_and_shape() {
        let inner = CallSite::constructor(
            key_of_type::<Handler>(),
            "Handler",
            vec![CallSite::scoped(key_of_type::<Clock>(), CallSite::create_instance(key_of_type::<Clock>(), "Clock"))],
        );
        let site = CallSite::singleton(key_of_type::<Handler>(), inner);

        assert_eq!(site.cache_lifetime(), Some(Lifetime::Singleton));
        assert_eq!(site.children()[0].cache_lifetime(), None);
        assert_eq!(site.node_count(), 4);
        assert_eq!(site.depth(), 4);
    }

    #[test]
    fn test_call_site_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CallSite>();
    }
}
