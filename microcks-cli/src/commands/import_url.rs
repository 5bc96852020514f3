//! `import-url` has the server download artifacts from remote URLs.

use clap::Args;
use microcks_client::ConnectOptions;
use microcks_shared::Result;

use super::ServerArgs;

#[derive(Args, Debug)]
pub struct ImportUrlArgs {
    /// Comma separated artifact URLs, each with optional `:primary` and
    /// `:secret` suffixes, e.g. `https://host/api.yaml:true:my-secret`
    #[arg(value_name = "URL[:primary[:secret]],...")]
    pub urls: String,

    #[command(flatten)]
    pub server: ServerArgs,
}

pub async fn execute(args: ImportUrlArgs, context: &str, options: &ConnectOptions) -> Result<()> {
    let handle = super::connect(&args.server, context, options).await?;

    for spec in args.urls.split(',') {
        let (url, main_artifact, secret) = split_url_spec(spec);

        let msg = handle
            .client
            .download_artifact(&url, main_artifact, secret.as_deref())
            .await?;
        println!("Microcks has discovered '{msg}'");
    }
    Ok(())
}

/// Splits `url[:primary[:secret]]` from the right so that scheme and port
/// colons inside the URL are left alone. Only a trailing segment that parses
/// as a boolean (optionally followed by a secret name) counts as annotation.
fn split_url_spec(spec: &str) -> (String, bool, Option<String>) {
    if let Some((rest, last)) = spec.rsplit_once(':') {
        if let Ok(main_artifact) = last.parse::<bool>() {
            return (rest.to_string(), main_artifact, None);
        }
        if let Some((url, flag)) = rest.rsplit_once(':') {
            if let Ok(main_artifact) = flag.parse::<bool>() {
                return (url.to_string(), main_artifact, Some(last.to_string()));
            }
        }
    }
    (spec.to_string(), true, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_url_defaults_to_primary() {
        let (url, main, secret) = split_url_spec("https://example.com/api.yaml");
        assert_eq!(url, "https://example.com/api.yaml");
        assert!(main);
        assert!(secret.is_none());
    }

    #[test]
    fn boolean_suffix_is_honoured() {
        let (url, main, secret) = split_url_spec("https://example.com/api.yaml:false");
        assert_eq!(url, "https://example.com/api.yaml");
        assert!(!main);
        assert!(secret.is_none());
    }

    #[test]
    fn secret_suffix_follows_the_boolean() {
        let (url, main, secret) = split_url_spec("https://example.com/api.yaml:true:gh-token");
        assert_eq!(url, "https://example.com/api.yaml");
        assert!(main);
        assert_eq!(secret.as_deref(), Some("gh-token"));
    }

    #[test]
    fn port_colons_are_preserved() {
        let (url, main, secret) = split_url_spec("http://host:8080/specs/api.yaml");
        assert_eq!(url, "http://host:8080/specs/api.yaml");
        assert!(main);
        assert!(secret.is_none());

        let (url, main, _) = split_url_spec("http://host:8080/specs/api.yaml:false");
        assert_eq!(url, "http://host:8080/specs/api.yaml");
        assert!(!main);
    }
}
