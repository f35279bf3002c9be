use crate::config::models::Profile;
use crate::constants::{SERVER_VAR_ORGANIZATION, SERVER_VAR_TENANT};
use crate::error::Error;
use crate::spec::ServerTemplate;
use url::Url;

/// Base URI of a definition after template substitution and profile overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServer {
    pub base_uri: Url,
    pub organization: Option<String>,
    pub tenant: Option<String>,
}

/// Resolves `{placeholder}` variables of a server URL template from the
/// active profile and the template's own defaults.
pub struct ServerVariableResolver<'a> {
    profile: &'a Profile,
}

impl<'a> ServerVariableResolver<'a> {
    #[must_use]
    pub const fn new(profile: &'a Profile) -> Self {
        Self { profile }
    }

    /// Substitutes every placeholder, then applies the profile `uri`
    /// override (scheme, host and port; the path is kept).
    ///
    /// # Errors
    ///
    /// Returns `MissingServerVariable` when a placeholder has no value, or a
    /// configuration error when the resulting URL is invalid.
    pub fn resolve(&self, server: &ServerTemplate) -> Result<ResolvedServer, Error> {
        let substituted = self.substitute_url(server)?;
        let mut base_uri = Url::parse(&substituted).map_err(|e| {
            Error::invalid_config(format!("Invalid server URL '{substituted}': {e}"))
        })?;

        if let Some(uri) = self.profile.uri.as_deref().filter(|u| !u.is_empty()) {
            apply_uri_override(&mut base_uri, uri)?;
        }

        Ok(ResolvedServer {
            base_uri,
            organization: self.lookup(SERVER_VAR_ORGANIZATION, server),
            tenant: self.lookup(SERVER_VAR_TENANT, server),
        })
    }

    /// Replaces each `{name}` in the template.
    ///
    /// # Errors
    ///
    /// Returns `MissingServerVariable` for the first placeholder without a
    /// value.
    pub fn substitute_url(&self, server: &ServerTemplate) -> Result<String, Error> {
        let mut result = server.url.clone();
        let mut start = 0;

        while let Some((open_pos, close_pos)) = find_next_template(&result, start) {
            let name = result[open_pos + 1..close_pos].to_string();
            let value = self
                .lookup(&name, server)
                .ok_or(Error::MissingServerVariable { name })?;
            result.replace_range(open_pos..=close_pos, &value);
            start = open_pos + value.len();
        }

        Ok(result)
    }

    /// Profile field (organization/tenant), then the profile `path` map,
    /// then the template default.
    fn lookup(&self, name: &str, server: &ServerTemplate) -> Option<String> {
        let field = match name {
            SERVER_VAR_ORGANIZATION => self.profile.organization.as_ref(),
            SERVER_VAR_TENANT => self.profile.tenant.as_ref(),
            _ => None,
        };
        field
            .or_else(|| self.profile.path.get(name))
            .or_else(|| server.defaults.get(name))
            .filter(|v| !v.is_empty())
            .cloned()
    }
}

fn apply_uri_override(base_uri: &mut Url, uri: &str) -> Result<(), Error> {
    let invalid = |reason: &str| Error::invalid_config(format!("Invalid uri '{uri}': {reason}"));
    let target = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;

    base_uri
        .set_scheme(target.scheme())
        .map_err(|()| invalid("unsupported scheme"))?;
    base_uri
        .set_host(target.host_str())
        .map_err(|e| invalid(&e.to_string()))?;
    base_uri
        .set_port(target.port())
        .map_err(|()| invalid("cannot set port"))?;
    Ok(())
}

/// Finds the next template variable boundaries (opening and closing braces)
fn find_next_template(s: &str, start: usize) -> Option<(usize, usize)> {
    let open_pos = s[start..].find('{').map(|pos| start + pos)?;
    let close_pos = s[open_pos..].find('}').map(|pos| open_pos + pos)?;
    Some((open_pos, close_pos))
}
