use crate::auth::{AuthRequest, AuthenticatorChain};
use crate::config::{OutputMode, Profile, ServerVariableResolver};
use crate::engine::binder::{bind, RawArguments};
use crate::engine::context::{ExecutionContext, InputStream};
use crate::error::Error;
use crate::spec::{Command, ServerTemplate};

/// Effective switches: a command-line flag, or the profile's setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub debug: bool,
    pub insecure: bool,
    pub output: OutputMode,
}

impl RunOptions {
    #[must_use]
    pub fn resolve(args: &RawArguments, profile: &Profile) -> Self {
        Self {
            debug: args.debug || profile.debug,
            insecure: args.insecure || profile.insecure,
            output: args.output.unwrap_or(profile.output),
        }
    }
}

/// Produces the execution context for one invocation.
///
/// Arguments are bound first, so a missing argument is reported even when
/// the profile is incomplete. The base URI is resolved next and fails before
/// any network call when a server variable has no value. Authentication runs
/// last.
///
/// # Errors
///
/// Returns binding, server variable or authentication errors.
pub async fn build_context(
    command: &Command,
    server: &ServerTemplate,
    args: &RawArguments,
    profile: &Profile,
    input: Option<&InputStream>,
    authenticators: &AuthenticatorChain,
) -> Result<ExecutionContext, Error> {
    let parameters = bind(command, args, profile, input)?;
    let resolved = ServerVariableResolver::new(profile).resolve(server)?;
    let options = RunOptions::resolve(args, profile);

    let auth = authenticators
        .authenticate(&AuthRequest {
            base_uri: resolved.base_uri.clone(),
            config: profile.auth.clone(),
            insecure: options.insecure,
        })
        .await?;

    Ok(ExecutionContext {
        definition: command.definition.clone(),
        group: command.group.clone(),
        command: command.name.clone(),
        method: command.method.clone(),
        route: command.route.clone(),
        content_type: command.content_type.clone(),
        base_uri: resolved.base_uri,
        organization: resolved.organization,
        tenant: resolved.tenant,
        parameters,
        auth,
        insecure: options.insecure,
        debug: options.debug,
        output: options.output,
    })
}
