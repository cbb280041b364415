//! Client bundle route factory.

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;

use crate::bundle::{Bundle, BuildInput, InlineSource, Loader};
use crate::http::response::{empty, javascript};
use crate::hydrate::codegen::{generate, HydrateComponent};
use crate::routing::{HandlerResult, RouteSet};

/// Serve the compiled hydration bundle for `components` at `GET <path>`.
///
/// The source document is generated once, here. Each request looks up the
/// concrete request path in the bundle cache and compiles on a miss.
pub fn client_route<S>(path: &str, components: &[HydrateComponent], import_header: &str) -> RouteSet<S>
where
    S: Clone + Send + Sync + 'static,
    Bundle: FromRef<S>,
{
    let source: Arc<str> = generate(components, import_header).into();
    let sourcefile: Arc<str> = source_file_name(path).into();

    tracing::debug!(
        path,
        components = components.len(),
        sourcefile = %sourcefile,
        "Client bundle route registered"
    );

    RouteSet::new().route(format!("GET@{path}"), move |req, ctx, _params| {
        let bundle = Bundle::from_ref(&ctx.state);
        let pathname = req.uri().path().to_string();
        serve_bundle(bundle, pathname, Arc::clone(&source), Arc::clone(&sourcefile))
    })
}

async fn serve_bundle(
    bundle: Bundle,
    pathname: String,
    source: Arc<str>,
    sourcefile: Arc<str>,
) -> HandlerResult {
    let input = || {
        BuildInput::Inline(InlineSource {
            contents: source.to_string(),
            sourcefile: sourcefile.to_string(),
            resolve_dir: bundle.working_dir().to_path_buf(),
            loader: Loader::Jsx,
        })
    };

    match bundle.get_or_build(&pathname, input).await? {
        Some(contents) => Ok(javascript(contents)),
        None => Ok(empty(StatusCode::NOT_FOUND)),
    }
}

/// `<basename of path without ':'>.jsx`; the root path becomes `index.jsx`.
pub fn source_file_name(path: &str) -> String {
    let stripped = path.replace(':', "");
    let base = stripped
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if base.is_empty() {
        "index.jsx".to_string()
    } else {
        format!("{base}.jsx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_name() {
        assert_eq!(source_file_name("/islands/counter.js"), "counter.js.jsx");
        assert_eq!(source_file_name("/bundle/:id"), "id.jsx");
        assert_eq!(source_file_name("/client/"), "client.jsx");
        assert_eq!(source_file_name("/"), "index.jsx");
    }
}
