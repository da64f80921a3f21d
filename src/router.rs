//! The router: template registration, lazy compilation, and lookup.

use std::sync::{Arc, PoisonError, RwLock};

use log::trace;

use crate::converters::ParamMap;
use crate::error::RouterError;
use crate::options::RouterOptions;
use crate::program::compile::compile;
use crate::program::CompiledMatcher;
use crate::template::parse_template;
use crate::tree::node::Terminal;
use crate::tree::Tree;

/// Whether a route's responders are expected to be synchronous or
/// asynchronous. Selects which [`MethodMapper`] validator runs for the
/// route's method map.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponderKind {
    /// Responders must be regular blocking functions.
    Sync,
    /// Responders must be non-blocking futures.
    Async,
}

/// Per-route registration options.
#[derive(Clone, Debug)]
pub struct RouteOptions {
    /// Opaque responder-name suffix, forwarded to the method-map builder.
    pub suffix: Option<String>,
    /// Compile the matcher during this call instead of on the next lookup.
    ///
    /// Compilation is otherwise delayed until the first routed request,
    /// which may noticeably slow that request when many routes exist.
    /// Setting this on the final registration avoids the delay; setting it
    /// on every registration makes adding hundreds of routes quadratic.
    pub compile: bool,
    /// Which responder kind the route's method map must satisfy.
    pub kind: ResponderKind,
}

impl Default for RouteOptions {
    fn default() -> RouteOptions {
        RouteOptions {
            suffix: None,
            compile: false,
            kind: ResponderKind::Sync,
        }
    }
}

/// Builds and validates the method map associated with each route.
///
/// The router never interprets the map; it stores whatever `map` returns
/// and hands it back from [`Router::find`]. The `require_*` hooks may wrap
/// responders in place or reject them; their errors surface unchanged from
/// [`Router::add_route`].
pub trait MethodMapper<R>: Send + Sync {
    /// The method-map type carried alongside each resource.
    type MethodMap: Send + Sync;

    /// Build the method map for a resource being registered.
    fn map(&self, resource: &R, options: &RouteOptions) -> Self::MethodMap;

    /// Validate a map registered with [`ResponderKind::Sync`].
    fn require_sync(&self, _map: &mut Self::MethodMap) -> anyhow::Result<()> {
        Ok(())
    }

    /// Validate a map registered with [`ResponderKind::Async`].
    fn require_async(&self, _map: &mut Self::MethodMap) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A [`MethodMapper`] for hosts that dispatch methods elsewhere: the
/// method map is `()` and every responder kind is accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMethodMapper;

impl<R> MethodMapper<R> for NoopMethodMapper {
    type MethodMap = ();

    fn map(&self, _resource: &R, _options: &RouteOptions) {}
}

/// A successful lookup: the bound resource, its method map, the extracted
/// field values, and the template that matched.
#[derive(Debug)]
pub struct RouteMatch<R, M> {
    /// The resource registered for the matched template.
    pub resource: Arc<R>,
    /// The method map built at registration time.
    pub method_map: Arc<M>,
    /// Field values extracted from the request path.
    pub params: ParamMap,
    /// The matched template, as written at registration.
    pub template: Arc<str>,
}

/// A URI router that compiles its routing tree into a decision program.
///
/// Templates are registered with [`add_route`](Router::add_route) and
/// looked up with [`find`](Router::find). The tree is the authoritative
/// model; the first lookup after a registration lowers it into an
/// immutable matcher that subsequent lookups share without contention.
///
/// Registration takes `&mut self` and lookups take `&self`, so the borrow
/// checker serializes mutation against concurrent lookups; wrap the router
/// in your own lock if routes must be added while serving.
pub struct Router<R, B: MethodMapper<R> = NoopMethodMapper> {
    mapper: B,
    options: RouterOptions,
    tree: Tree<R, B::MethodMap>,
    compiled: RwLock<Option<Arc<CompiledMatcher<R, B::MethodMap>>>>,
}

impl<R> Router<R> {
    /// A router whose routes carry no method maps.
    pub fn new() -> Router<R> {
        Router::with_mapper(NoopMethodMapper)
    }
}

impl<R> Default for Router<R> {
    fn default() -> Router<R> {
        Router::new()
    }
}

impl<R, B: MethodMapper<R>> Router<R, B> {
    /// A router using `mapper` to build and validate method maps.
    pub fn with_mapper(mapper: B) -> Router<R, B> {
        Router {
            mapper,
            options: RouterOptions::new(),
            tree: Tree::new(),
            compiled: RwLock::new(None),
        }
    }

    /// The router's options.
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// The router's options, for converter registration. Changes apply to
    /// templates registered afterwards.
    pub fn options_mut(&mut self) -> &mut RouterOptions {
        &mut self.options
    }

    /// Register a route between a URI template and a resource.
    ///
    /// Registering the same template again replaces the previous binding.
    /// On error the router is unchanged: validation runs before the tree
    /// is touched, and tree insertion is atomic.
    pub fn add_route(
        &mut self,
        template: &str,
        resource: R,
        options: RouteOptions,
    ) -> Result<(), RouterError> {
        trace!(" adding route `{}`", template);

        let mut method_map = self.mapper.map(&resource, &options);
        match options.kind {
            ResponderKind::Sync => self.mapper.require_sync(&mut method_map),
            ResponderKind::Async => self.mapper.require_async(&mut method_map),
        }
        .map_err(RouterError::ResponderKindMismatch)?;

        let parsed = parse_template(template, self.options.converters())?;
        let terminal = Terminal {
            resource: Arc::new(resource),
            method_map: Arc::new(method_map),
            template: Arc::from(template),
        };
        self.tree.insert(&parsed, terminal)?;

        // Any successful registration invalidates the compiled matcher.
        *self
            .compiled
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;

        if options.compile {
            let _ = self.matcher();
        }
        Ok(())
    }

    /// Search for a route matching the given request path.
    ///
    /// Leading slashes are stripped and the remainder is split on `/`;
    /// empty segments are significant, so `/a/` and `/a` are distinct
    /// paths. The path is expected to be percent-decoded already (see
    /// [`helpers::path`](crate::helpers::path)).
    pub fn find(&self, path: &str) -> Option<RouteMatch<R, B::MethodMap>> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        self.find_segments(&segments)
    }

    /// Search for a route matching an already-split request path.
    pub fn find_segments(&self, segments: &[&str]) -> Option<RouteMatch<R, B::MethodMap>> {
        let matcher = self.matcher();
        let (binding, params) = matcher.lookup(segments)?;
        let terminal = matcher.binding(binding);
        Some(RouteMatch {
            resource: Arc::clone(&terminal.resource),
            method_map: Arc::clone(&terminal.method_map),
            params,
            template: Arc::clone(&terminal.template),
        })
    }

    /// The textual rendering of the compiled decision program, for
    /// introspection. Reading it forces a compile. Advisory only: the
    /// format is not part of the compatibility surface.
    pub fn matcher_source(&self) -> String {
        self.matcher().source().to_string()
    }

    /// The current matcher, compiling it first if the tree has changed
    /// since the last compile.
    fn matcher(&self) -> Arc<CompiledMatcher<R, B::MethodMap>> {
        {
            let guard = self.compiled.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(matcher) = guard.as_ref() {
                return Arc::clone(matcher);
            }
        }

        // Dirty: re-check under the write lock so a single thread
        // compiles while the rest wait and then share the result.
        let mut guard = self
            .compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(matcher) = guard.as_ref() {
            return Arc::clone(matcher);
        }
        let matcher = Arc::new(compile(self.tree.roots()));
        *guard = Some(Arc::clone(&matcher));
        matcher
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::converters::{
        ConverterArgs, ConverterFactory, FieldConverter, FieldValue, Fragment,
    };
    use crate::error::UnacceptableRouteError;

    fn router() -> Router<&'static str> {
        Router::new()
    }

    fn add(router: &mut Router<&'static str>, template: &str, resource: &'static str) {
        router
            .add_route(template, resource, RouteOptions::default())
            .unwrap();
    }

    fn segment(value: &str) -> FieldValue {
        FieldValue::Segment(value.to_string())
    }

    #[test]
    fn matches_int_converter_templates() {
        let mut router = router();
        add(&mut router, "/items/{id:int}", "R1");

        let m = router.find("/items/42").unwrap();
        assert_eq!(*m.resource, "R1");
        assert_eq!(&*m.template, "/items/{id:int}");
        assert_eq!(m.params.len(), 1);
        assert_eq!(m.params["id"], FieldValue::Int(42));

        assert!(router.find("/items/foo").is_none());
        assert!(router.find("/items").is_none());
        assert!(router.find("/items/42/x").is_none());
    }

    #[test]
    fn deeper_template_wins_over_prefix() {
        let mut router = router();
        add(&mut router, "/a/{x}", "R1");
        add(&mut router, "/a/{x}/b", "R2");

        let m = router.find("/a/7/b").unwrap();
        assert_eq!(*m.resource, "R2");
        assert_eq!(m.params["x"], segment("7"));

        let m = router.find("/a/7").unwrap();
        assert_eq!(*m.resource, "R1");
    }

    #[test]
    fn sibling_simple_fields_conflict_and_roll_back() {
        let mut router = router();
        add(&mut router, "/a/{x}", "R1");

        let err = router
            .add_route("/a/{y}", "R2", RouteOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::UnacceptableRoute(UnacceptableRouteError::ConflictingTemplate { .. })
        ));

        // The failed registration left earlier routes untouched.
        let m = router.find("/a/7").unwrap();
        assert_eq!(*m.resource, "R1");
        assert_eq!(m.params["x"], segment("7"));
    }

    #[test]
    fn multi_segment_converter_consumes_the_remainder() {
        let mut router = router();
        add(&mut router, "/files/{path:path}", "R1");

        let m = router.find("/files/a/b/c").unwrap();
        assert_eq!(*m.resource, "R1");
        assert_eq!(
            m.params["path"],
            FieldValue::Segments(vec!["a".into(), "b".into(), "c".into()])
        );

        let m = router.find("/files/only").unwrap();
        assert_eq!(m.params["path"], FieldValue::Segments(vec!["only".into()]));

        assert!(router.find("/files").is_none());
    }

    #[test]
    fn complex_segments_extract_named_fields() {
        let mut router = router();
        add(&mut router, "/img/{name}.{ext}", "R1");

        let m = router.find("/img/cat.png").unwrap();
        assert_eq!(*m.resource, "R1");
        assert_eq!(m.params.len(), 2);
        assert_eq!(m.params["name"], segment("cat"));
        assert_eq!(m.params["ext"], segment("png"));

        // Greedy fields split at the last separator.
        let m = router.find("/img/cat.x.png").unwrap();
        assert_eq!(m.params["name"], segment("cat.x"));
        assert_eq!(m.params["ext"], segment("png"));

        assert!(router.find("/img/noext").is_none());
    }

    #[test]
    fn literals_win_over_fields() {
        let mut router = router();
        add(&mut router, "/foo/{id}", "R_field");
        add(&mut router, "/foo/all", "R_literal");
        add(&mut router, "/foo/{name}.{ext}", "R_complex");

        assert_eq!(*router.find("/foo/all").unwrap().resource, "R_literal");
        assert_eq!(*router.find("/foo/a.b").unwrap().resource, "R_complex");
        assert_eq!(*router.find("/foo/xyz").unwrap().resource, "R_field");
    }

    #[test]
    fn failed_branches_leak_no_params() {
        let mut router = router();
        add(&mut router, "/{name}.{ext}/tail", "R1");
        add(&mut router, "/{file}", "R2");

        // `cat.png` walks into the complex branch, captures groups, then
        // fails the length check; the simple fallback must not see them.
        let m = router.find("/cat.png").unwrap();
        assert_eq!(*m.resource, "R2");
        assert_eq!(m.params.len(), 1);
        assert_eq!(m.params["file"], segment("cat.png"));

        let m = router.find("/cat.png/tail").unwrap();
        assert_eq!(*m.resource, "R1");
        assert_eq!(m.params.len(), 2);
    }

    #[test]
    fn converter_rejection_disqualifies_the_branch_without_leaks() {
        let mut router = router();
        add(&mut router, "/v/{major:int}.{minor:int}.{tag}", "R_version");
        add(&mut router, "/v/{raw}", "R_raw");

        let m = router.find("/v/1.2.beta").unwrap();
        assert_eq!(*m.resource, "R_version");
        assert_eq!(m.params["major"], FieldValue::Int(1));
        assert_eq!(m.params["minor"], FieldValue::Int(2));
        assert_eq!(m.params["tag"], segment("beta"));

        // `major` converts, `minor` rejects: the partial conversions stay
        // out of the params of the route that actually matches.
        let m = router.find("/v/1.x.beta").unwrap();
        assert_eq!(*m.resource, "R_raw");
        assert_eq!(m.params.len(), 1);
        assert_eq!(m.params["raw"], segment("1.x.beta"));
    }

    #[test]
    fn uuid_and_datetime_converters() {
        let mut router = router();
        add(&mut router, "/by-id/{id:uuid}", "R_uuid");
        add(&mut router, "/since/{when:dt}", "R_dt");

        let m = router
            .find("/by-id/67c25de6-d704-4bb3-bf7e-10ac35d89310")
            .unwrap();
        assert_eq!(*m.resource, "R_uuid");
        assert!(m.params["id"].as_uuid().is_some());

        let m = router.find("/since/2024-01-02T03:04:05Z").unwrap();
        assert_eq!(*m.resource, "R_dt");
        assert!(m.params["when"].as_datetime().is_some());

        assert!(router.find("/by-id/42").is_none());
        assert!(router.find("/since/yesterday").is_none());
    }

    #[test]
    fn root_trailing_slash_and_empty_segments() {
        let mut router = router();
        add(&mut router, "/", "R_root");
        add(&mut router, "/items", "R_items");
        add(&mut router, "/items/", "R_items_slash");
        add(&mut router, "/a//b", "R_gap");

        assert_eq!(*router.find("/").unwrap().resource, "R_root");
        assert_eq!(*router.find("").unwrap().resource, "R_root");
        assert_eq!(*router.find("/items").unwrap().resource, "R_items");
        assert_eq!(*router.find("/items/").unwrap().resource, "R_items_slash");
        assert_eq!(*router.find("/a//b").unwrap().resource, "R_gap");
        assert!(router.find("/a/b").is_none());
    }

    #[test]
    fn unicode_literals_and_captures() {
        let mut router = router();
        add(&mut router, "/café/{word}", "R1");

        let m = router.find("/café/日本語").unwrap();
        assert_eq!(m.params["word"], segment("日本語"));
        assert!(router.find("/cafe/日本語").is_none());
    }

    #[test]
    fn params_key_set_equals_template_fields() {
        let mut router = router();
        add(&mut router, "/{a}/{b}.{c}/{d:int}", "R1");

        let m = router.find("/x/y.z/3").unwrap();
        let mut keys: Vec<&str> = m.params.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn reregistration_replaces_the_binding() {
        let mut router = router();
        add(&mut router, "/a/{x}", "R1");
        add(&mut router, "/a/{x}", "R2");

        let m = router.find("/a/1").unwrap();
        assert_eq!(*m.resource, "R2");
        assert_eq!(&*m.template, "/a/{x}");
    }

    #[test]
    fn registrations_after_a_lookup_recompile() {
        let mut router = router();
        add(&mut router, "/a", "R1");
        assert!(router.find("/b").is_none());

        add(&mut router, "/b", "R2");
        assert_eq!(*router.find("/b").unwrap().resource, "R2");
        assert_eq!(*router.find("/a").unwrap().resource, "R1");
    }

    #[test]
    fn eager_compile_option() {
        let mut router = router();
        router
            .add_route(
                "/items/{id:int}",
                "R1",
                RouteOptions {
                    compile: true,
                    ..RouteOptions::default()
                },
            )
            .unwrap();

        assert_eq!(*router.find("/items/7").unwrap().resource, "R1");
    }

    #[test]
    fn matcher_source_renders_the_program() {
        let mut router = router();
        add(&mut router, "/items/{id:int}", "R1");

        let source = router.matcher_source();
        assert!(source.contains("if path_len > 0 {"));
        assert!(source.contains("if path[0] == \"items\" {"));
        assert!(source.contains("converters[0].convert(fragment)"));
        assert!(source.contains("return Some(routes[0]);"));
        assert!(source.ends_with("return None;\n"));
    }

    #[test]
    fn concurrent_first_lookups_share_one_compile() {
        let mut router = router();
        add(&mut router, "/items/{id:int}", "R1");
        add(&mut router, "/files/{rest:path}", "R2");

        let router = Arc::new(router);
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let router = Arc::clone(&router);
                thread::spawn(move || {
                    let m = router.find(&format!("/items/{}", i)).unwrap();
                    assert_eq!(*m.resource, "R1");
                    assert_eq!(m.params["id"], FieldValue::Int(i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn custom_converters_extend_the_registry() {
        struct HexConverter;

        impl FieldConverter for HexConverter {
            fn convert(&self, fragment: &Fragment<'_>) -> Option<FieldValue> {
                let segment = fragment.as_segment()?;
                i64::from_str_radix(segment, 16).ok().map(FieldValue::Int)
            }
        }

        struct HexConverterFactory;

        impl ConverterFactory for HexConverterFactory {
            fn construct(&self, args: ConverterArgs) -> anyhow::Result<Arc<dyn FieldConverter>> {
                args.finish()?;
                Ok(Arc::new(HexConverter))
            }
        }

        let mut router = router();
        assert!(matches!(
            router.add_route("/blob/{addr:hex}", "R1", RouteOptions::default()),
            Err(RouterError::UnacceptableRoute(
                UnacceptableRouteError::UnknownConverter(_)
            ))
        ));

        router
            .options_mut()
            .converters_mut()
            .insert("hex", Arc::new(HexConverterFactory))
            .unwrap();
        add(&mut router, "/blob/{addr:hex}", "R1");

        let m = router.find("/blob/ff").unwrap();
        assert_eq!(m.params["addr"], FieldValue::Int(255));
        assert!(router.find("/blob/zz").is_none());
    }

    #[test]
    fn method_maps_are_built_and_validated() {
        struct SuffixMapper;

        impl MethodMapper<&'static str> for SuffixMapper {
            type MethodMap = String;

            fn map(&self, resource: &&'static str, options: &RouteOptions) -> String {
                match &options.suffix {
                    Some(suffix) => format!("{}:{}", resource, suffix),
                    None => (*resource).to_string(),
                }
            }

            fn require_async(&self, map: &mut String) -> anyhow::Result<()> {
                anyhow::bail!("responder `{}` must be a non-blocking future", map)
            }
        }

        let mut router = Router::with_mapper(SuffixMapper);
        router
            .add_route(
                "/things",
                "R1",
                RouteOptions {
                    suffix: Some("collection".to_string()),
                    ..RouteOptions::default()
                },
            )
            .unwrap();

        let m = router.find("/things").unwrap();
        assert_eq!(&*m.method_map, "R1:collection");

        let err = router
            .add_route(
                "/others",
                "R2",
                RouteOptions {
                    kind: ResponderKind::Async,
                    ..RouteOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::ResponderKindMismatch(_)));
        assert!(router.find("/others").is_none());
    }

    #[test]
    fn find_on_matched_segments_is_idempotent() {
        let mut router = router();
        add(&mut router, "/a/{x}/b", "R1");

        let first = router.find("/a/seg/b").unwrap();
        let rebuilt = format!("/{}", ["a", "seg", "b"].join("/"));
        let second = router.find(&rebuilt).unwrap();

        assert_eq!(*first.resource, *second.resource);
        assert_eq!(first.params, second.params);
        assert_eq!(first.template, second.template);
    }
}
