#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_callsite::*;
use std::sync::Arc;

struct Svc;

const MAX_NODES: usize = 4096;

/// Decodes a plan from fuzzer bytes. Each byte picks a variant; composite
/// variants take their child count from the next byte.
struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    nodes: usize,
}

impl<'a> Decoder<'a> {
    fn next(&mut self) -> u8 {
        let byte = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.data.len() || self.nodes >= MAX_NODES
    }

    fn children(&mut self) -> Vec<CallSite> {
        let count = (self.next() % 5) as usize;
        (0..count).map(|_| self.plan()).collect()
    }

    fn plan(&mut self) -> CallSite {
        self.nodes += 1;
        let tag = if self.exhausted() { 4 } else { self.next() % 10 };
        let key = key_of_type::<Svc>();
        match tag {
            0 => CallSite::transient(key, self.plan()),
            1 => CallSite::constructor(key, "Svc", self.children()),
            2 => CallSite::singleton(key, self.plan()),
            3 => CallSite::scoped(key, self.plan()),
            4 => CallSite::constant_value(self.pos),
            5 => CallSite::create_instance(key, "Svc"),
            6 => CallSite::service_provider(key),
            7 => CallSite::service_scope_factory(key),
            8 => CallSite::enumerable(key_of_type::<Vec<Svc>>(), key, self.children()),
            _ => CallSite::factory(key, || Arc::new(Svc)),
        }
    }
}

fn contains_scoped(site: &CallSite) -> bool {
    site.kind() == CallSiteKind::Scoped || site.children().iter().any(contains_scoped)
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut decoder = Decoder { data, pos: 0, nodes: 0 };
    let plan = decoder.plan();

    let result = analyze(&plan);
    assert_eq!(result, analyze(&plan));
    assert_eq!(result.requires_scope_lock, contains_scoped(&plan));
    assert!(result.estimated_size <= plan.node_count() * 64);

    let graph = PlanGraph::from_call_site(&plan);
    assert_eq!(graph.nodes.len(), plan.node_count());
    assert_eq!(graph.metadata.estimated_size, result.estimated_size);
    let _ = graph.export(ExportFormat::Json);
});
