use crate::error::HttpError;
use crate::http::Method;
use crate::middleware::{HandlerEntry, IntoHandlers};
use crate::path::{is_param_segment, param_name, split_path};
use std::collections::HashMap;

/// A node in the route tree. Literal children live in `children`, keyed by
/// their exact segment string; at most one parameter child may exist at
/// any node, held in its own dedicated field rather than discovered by
/// scanning `children` for a `:`-prefixed key. This makes the
/// at-most-one-parameter-child invariant structural and lookup O(1) per
/// segment instead of a scan.
#[derive(Default)]
pub struct RouteNode {
    children: HashMap<String, RouteNode>,
    param_child: Option<(String, Box<RouteNode>)>,
    handlers: HashMap<Method, Vec<HandlerEntry>>,
    params: HashMap<Method, Vec<(usize, String)>>,
    endpoint: bool,
}

impl RouteNode {
    fn new() -> Self {
        Self::default()
    }

    /// Descends to (creating if necessary) the child reached by `segment`,
    /// enforcing that a literal segment never collides with an existing
    /// parameter child shape at the same depth, and vice versa.
    fn child_mut(&mut self, segment: &str) -> anyhow::Result<&mut RouteNode> {
        if is_param_segment(segment) {
            let name = param_name(segment).to_string();
            match &self.param_child {
                Some((existing, _)) if existing != &name => {
                    anyhow::bail!(
                        "conflicting parameter name at this depth: already registered \
                         as `:{}`, cannot also register `:{}`",
                        existing,
                        name
                    );
                }
                Some(_) => {}
                None => {
                    self.param_child = Some((name, Box::new(RouteNode::new())));
                }
            }
            Ok(&mut self.param_child.as_mut().unwrap().1)
        } else {
            // A literal sibling is always allowed alongside the (at most
            // one) parameter child at this depth; lookup's literal-first
            // precedence is what keeps this unambiguous, not a
            // registration-time restriction.
            Ok(self.children.entry(segment.to_string()).or_default())
        }
    }

    fn child(&self, segment: &str) -> Option<&RouteNode> {
        if let Some(child) = self.children.get(segment) {
            return Some(child);
        }
        self.param_child.as_ref().map(|(_, node)| node.as_ref())
    }

    /// Attaches `other`'s subtree beneath `self`: attach-or-skip per node
    /// (first registration wins; no deep merge).
    fn attach(&mut self, other: RouteNode) {
        if !self.endpoint && other.endpoint {
            self.endpoint = true;
            self.handlers = other.handlers;
            self.params = other.params;
        }
        for (key, child) in other.children {
            self.children.entry(key).or_insert(child);
        }
        if self.param_child.is_none() {
            self.param_child = other.param_child;
        }
    }
}

/// Owns the route tree and the global-middleware map. Registration methods
/// are meant to run entirely before `Server::listen`; nothing in this type
/// is safe to mutate concurrently with request handling.
#[derive(Default)]
pub struct Router {
    root: RouteNode,
    /// `(prefix, middlewares)` in registration order; a prefix registered
    /// more than once has its middlewares appended to the existing entry
    /// rather than creating a second one.
    globals: Vec<(String, Vec<HandlerEntry>)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn effective_middlewares(&self, pattern: &str) -> Vec<HandlerEntry> {
        let mut out = Vec::new();
        for (prefix, list) in &self.globals {
            if prefix == "/" || pattern.starts_with(prefix.as_str()) {
                out.extend(list.iter().cloned());
            }
        }
        out
    }

    fn register(&mut self, method: Method, pattern: &str, handlers: Vec<HandlerEntry>) {
        if let Err(err) = self.try_register(method, pattern, handlers) {
            panic!("failed to register route {} {}: {}", method, pattern, err);
        }
    }

    fn try_register(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<HandlerEntry>,
    ) -> anyhow::Result<()> {
        let segments = split_path(pattern);
        let mut params = Vec::new();
        for (idx, segment) in segments.iter().enumerate() {
            if is_param_segment(segment) {
                params.push((idx, param_name(segment).to_string()));
            }
        }

        let mut node = &mut self.root;
        for segment in &segments {
            node = node.child_mut(segment)?;
        }

        // Idempotent re-registration: the same method registered twice at
        // the same node is a no-op, first handler list wins.
        if node.handlers.contains_key(&method) {
            return Ok(());
        }

        let mut composed = self.effective_middlewares(pattern);
        composed.extend(handlers);

        node.handlers.insert(method, composed);
        node.params.insert(method, params);
        node.endpoint = true;
        Ok(())
    }

    /// Global middleware registered under `/`: applies to every route
    /// registered after this call.
    pub fn middleware<H: IntoHandlers>(mut self, handler: H) -> Self {
        self.middleware_at_mut("/", handler);
        self
    }

    /// Global middleware scoped to routes whose pattern matches `prefix`
    /// (either `prefix == "/"` or the pattern starts with `prefix`),
    /// applied only to routes registered after this call.
    pub fn middleware_at<H: IntoHandlers>(mut self, prefix: &str, handler: H) -> Self {
        self.middleware_at_mut(prefix, handler);
        self
    }

    fn middleware_at_mut<H: IntoHandlers>(&mut self, prefix: &str, handler: H) {
        let mut handlers = handler.into_handlers();
        if let Some((_, existing)) = self.globals.iter_mut().find(|(p, _)| p == prefix) {
            existing.append(&mut handlers);
        } else {
            self.globals.push((prefix.to_string(), handlers));
        }
    }

    /// Mounts `sub`'s tree beneath `prefix` on this router: walks/creates
    /// literal nodes down to the target, then attaches each of `sub`'s
    /// children attach-or-skip, and rebases `sub`'s global middlewares
    /// under `prefix` into this router's global map.
    pub fn mount(mut self, prefix: &str, sub: Router) -> Self {
        let segments = split_path(prefix);
        let mut node = &mut self.root;
        for segment in &segments {
            node = node
                .child_mut(segment)
                .expect("mount: prefix segment conflicts with an existing route shape");
        }
        node.attach(sub.root);

        let normalized_prefix = normalize_prefix(prefix);
        for (sub_prefix, list) in sub.globals {
            let rebased = format!("{}{}", normalized_prefix, normalize_prefix(&sub_prefix));
            let rebased = if rebased.is_empty() {
                "/".to_string()
            } else {
                rebased
            };
            if let Some((_, existing)) = self.globals.iter_mut().find(|(p, _)| p == &rebased) {
                existing.extend(list);
            } else {
                self.globals.push((rebased, list));
            }
        }
        self
    }

    pub fn get<H: IntoHandlers>(mut self, path: &str, handlers: H) -> Self {
        self.register(Method::Get, path, handlers.into_handlers());
        self
    }

    /// Fallible form of `get`: returns the registration conflict instead of
    /// panicking, for callers who want to handle it themselves.
    pub fn try_get<H: IntoHandlers>(mut self, path: &str, handlers: H) -> anyhow::Result<Self> {
        self.try_register(Method::Get, path, handlers.into_handlers())?;
        Ok(self)
    }

    pub fn post<H: IntoHandlers>(mut self, path: &str, handlers: H) -> Self {
        self.register(Method::Post, path, handlers.into_handlers());
        self
    }

    /// Fallible form of `post`: returns the registration conflict instead of
    /// panicking, for callers who want to handle it themselves.
    pub fn try_post<H: IntoHandlers>(mut self, path: &str, handlers: H) -> anyhow::Result<Self> {
        self.try_register(Method::Post, path, handlers.into_handlers())?;
        Ok(self)
    }

    pub fn put<H: IntoHandlers>(mut self, path: &str, handlers: H) -> Self {
        self.register(Method::Put, path, handlers.into_handlers());
        self
    }

    /// Fallible form of `put`: returns the registration conflict instead of
    /// panicking, for callers who want to handle it themselves.
    pub fn try_put<H: IntoHandlers>(mut self, path: &str, handlers: H) -> anyhow::Result<Self> {
        self.try_register(Method::Put, path, handlers.into_handlers())?;
        Ok(self)
    }

    pub fn patch<H: IntoHandlers>(mut self, path: &str, handlers: H) -> Self {
        self.register(Method::Patch, path, handlers.into_handlers());
        self
    }

    /// Fallible form of `patch`: returns the registration conflict instead
    /// of panicking, for callers who want to handle it themselves.
    pub fn try_patch<H: IntoHandlers>(mut self, path: &str, handlers: H) -> anyhow::Result<Self> {
        self.try_register(Method::Patch, path, handlers.into_handlers())?;
        Ok(self)
    }

    pub fn delete<H: IntoHandlers>(mut self, path: &str, handlers: H) -> Self {
        self.register(Method::Delete, path, handlers.into_handlers());
        self
    }

    /// Fallible form of `delete`: returns the registration conflict instead
    /// of panicking, for callers who want to handle it themselves.
    pub fn try_delete<H: IntoHandlers>(mut self, path: &str, handlers: H) -> anyhow::Result<Self> {
        self.try_register(Method::Delete, path, handlers.into_handlers())?;
        Ok(self)
    }

    /// Resolves `(path, method)` to a handler list and the extracted path
    /// parameters. Deterministic given the registration history;
    /// literal children always beat the parameter child at the same depth.
    pub fn lookup(
        &self,
        path: &str,
        method: Method,
    ) -> Result<(&[HandlerEntry], HashMap<String, String>), HttpError> {
        let segments = split_path(path);
        let mut node = &self.root;
        let mut captured: Vec<&str> = Vec::with_capacity(segments.len());

        for segment in &segments {
            match node.child(segment) {
                Some(child) => {
                    captured.push(segment);
                    node = child;
                }
                None => return Err(HttpError::not_found(method, path)),
            }
        }

        if !node.endpoint {
            return Err(HttpError::not_found(method, path));
        }

        let handlers = node
            .handlers
            .get(&method)
            .ok_or_else(|| HttpError::method_not_allowed(method, path))?;

        let empty = Vec::new();
        let param_positions = node.params.get(&method).unwrap_or(&empty);
        let mut params = HashMap::with_capacity(param_positions.len());
        for (idx, name) in param_positions {
            if let Some(value) = captured.get(*idx) {
                params.insert(name.clone(), value.to_string());
            }
        }

        Ok((handlers.as_slice(), params))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let segments = split_path(prefix);
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}
