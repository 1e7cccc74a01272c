//! Control-plane interface definition
//!
//! Only the parts the gateway routes on are read: the package name, the
//! first `service` block and its `rpc` method names.

use std::path::{Path, PathBuf};

use farmgate_core::{GatewayError, GatewayResult};

/// Methods declared by the control-plane service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDefinition {
    pub package: Option<String>,
    pub service: String,
    pub methods: Vec<String>,
    /// File the definition was read from, if any
    pub path: Option<PathBuf>,
}

impl InterfaceDefinition {
    pub fn load(path: &Path) -> GatewayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::ConfigurationError(format!(
                "cannot read interface definition {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut definition = Self::parse(&text)?;
        definition.path = Some(path.to_path_buf());
        Ok(definition)
    }

    pub fn parse(text: &str) -> GatewayResult<Self> {
        let mut package = None;
        let mut service: Option<String> = None;
        let mut methods = Vec::new();
        let mut depth = 0usize;
        let mut service_depth = None;

        for raw in text.lines() {
            let line = match raw.find("//") {
                Some(i) => &raw[..i],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let mut words = line.split_whitespace();
            match words.next() {
                Some("package") if depth == 0 => {
                    package = words
                        .next()
                        .map(|p| p.trim_end_matches(';').to_string())
                        .filter(|p| !p.is_empty());
                }
                Some("service") if service.is_none() => {
                    if let Some(name) = words.next() {
                        service = Some(name.trim_end_matches('{').to_string());
                        service_depth = Some(depth);
                    }
                }
                Some("rpc") if service_depth.is_some_and(|d| depth == d + 1) => {
                    if let Some(rest) = words.next() {
                        let name = rest.split('(').next().unwrap_or_default();
                        if !name.is_empty() {
                            methods.push(name.to_string());
                        }
                    }
                }
                _ => {}
            }

            depth += line.matches('{').count();
            depth = depth.saturating_sub(line.matches('}').count());
            if service_depth.is_some_and(|d| depth <= d) && line.contains('}') {
                service_depth = None;
            }
        }

        let service = service.ok_or_else(|| {
            GatewayError::ConfigurationError("interface definition declares no service".into())
        })?;

        Ok(Self {
            package,
            service,
            methods,
            path: None,
        })
    }

    pub fn declares(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Fully-qualified service name, e.g. `loadbalancer.LoadBalancer`
    pub fn qualified_service(&self) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, self.service),
            None => self.service.clone(),
        }
    }

    /// HTTP route for `method`: `/<package>.<Service>/<Method>`
    pub fn route(&self, method: &str) -> String {
        format!("/{}/{}", self.qualified_service(), method)
    }
}
