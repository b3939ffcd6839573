//! Subcommand handlers. Each returns `Ok(false)` when the call did not
//! complete, so the caller can map it to a failing exit status.

use std::path::Path;

use anyhow::{anyhow, bail, Context as _};
use context::{LoginError, QueryContext};
use contract::{
    CookieAccessor, CookieName, Endpoint, LoginForm, MultipartForm, RequestDescriptor,
};
use serde_json::Value;
use tracing::info;

use crate::args::{LoginArgs, MutateArgs, TokenAction};

pub async fn get(ctx: &QueryContext, endpoint: &str) -> anyhow::Result<bool> {
    let endpoint = parse_endpoint(endpoint)?;
    let data: Option<Value> = ctx.get_data(&endpoint).await;
    emit(data.as_ref())
}

pub async fn mutate(ctx: &QueryContext, args: MutateArgs) -> anyhow::Result<bool> {
    let descriptor = build_mutation(args).await?;
    let reply: Option<Value> = ctx.on_mutate(descriptor).await;
    emit(reply.as_ref())
}

pub async fn session(ctx: &QueryContext) -> anyhow::Result<bool> {
    match ctx.session().current_session().await {
        Ok(status) => {
            let value = serde_json::to_value(&status).context("encoding session status")?;
            emit(Some(&value))
        }
        Err(e) => {
            tracing::warn!(kind = %e.kind(), error = %e, "Session check did not complete");
            emit(None)
        }
    }
}

/// Prints the login reply. Succeeds only when a token was stored.
pub async fn login(
    ctx: &QueryContext,
    cookies: &dyn CookieAccessor,
    args: LoginArgs,
) -> anyhow::Result<bool> {
    let form = LoginForm {
        email: args.email,
        mot_de_passe: args.password,
    };
    let reply = match ctx.login(cookies, form).await {
        Ok(reply) => reply,
        Err(LoginError::Request(e)) => {
            tracing::warn!(kind = %e.kind(), error = %e, "Login did not complete");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::to_value(&reply).context("encoding login reply")?;
    emit(Some(&value))?;
    Ok(reply.accepted_token().is_some())
}

pub async fn token(cookies: &dyn CookieAccessor, action: TokenAction) -> anyhow::Result<bool> {
    let name = CookieName::auth_token();
    match action {
        TokenAction::Set { value } => {
            if value.trim().is_empty() {
                bail!("refusing to store an empty token");
            }
            cookies.set(&name, value).await?;
            info!(cookie = %name, "Token stored");
            Ok(true)
        }
        TokenAction::Get => match cookies.get(&name).await? {
            Some(value) => {
                println!("{value}");
                Ok(true)
            }
            None => Ok(false),
        },
        TokenAction::Delete => {
            cookies.delete(&name).await?;
            info!(cookie = %name, "Token removed");
            Ok(true)
        }
    }
}

async fn build_mutation(args: MutateArgs) -> anyhow::Result<RequestDescriptor> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let descriptor = RequestDescriptor::mutation(endpoint).method(args.method.into());

    if let Some(text) = args.json {
        let body: Value = serde_json::from_str(&text).context("--json is not valid JSON")?;
        return Ok(descriptor.json(body));
    }
    if args.field.is_empty() && args.file.is_empty() {
        return Ok(descriptor);
    }

    let mut form = MultipartForm::new();
    for (name, value) in args.field {
        form = form.text(name, value);
    }
    for (name, path) in args.file {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        form = form.file(name, file_name(&path), None, bytes);
    }
    Ok(descriptor.multipart(form))
}

fn parse_endpoint(raw: &str) -> anyhow::Result<Endpoint> {
    Endpoint::new(raw).ok_or_else(|| anyhow!("endpoint must not be empty"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_owned())
}

fn emit(value: Option<&Value>) -> anyhow::Result<bool> {
    match value {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::MutateMethod;
    use contract::{ContentType, FormPart, HttpMethod, RequestBody};
    use serde_json::json;
    use session::MemoryCookieStore;

    fn args(endpoint: &str) -> MutateArgs {
        MutateArgs {
            endpoint: endpoint.to_owned(),
            method: MutateMethod::Post,
            json: None,
            field: Vec::new(),
            file: Vec::new(),
        }
    }

    #[tokio::test]
    async fn json_text_becomes_json_body() {
        let mut request = args("/api/auth/login");
        request.json = Some(r#"{"email":"a@b.com"}"#.to_owned());

        let descriptor = build_mutation(request).await.unwrap();

        assert_eq!(descriptor.content_type, ContentType::Json);
        assert_eq!(descriptor.body, RequestBody::Json(json!({"email": "a@b.com"})));
    }

    #[tokio::test]
    async fn invalid_json_is_rejected() {
        let mut request = args("/api/x");
        request.json = Some("{not json".to_owned());
        assert!(build_mutation(request).await.is_err());
    }

    #[tokio::test]
    async fn fields_become_multipart_in_order() {
        let mut request = args("/api/auth/update-profile/");
        request.method = MutateMethod::Put;
        request.field = vec![
            ("nom_famille".to_owned(), "Doe".to_owned()),
            ("prenom".to_owned(), "John".to_owned()),
        ];

        let descriptor = build_mutation(request).await.unwrap();

        assert_eq!(descriptor.method, HttpMethod::Put);
        assert_eq!(descriptor.content_type, ContentType::Multipart);
        let RequestBody::Multipart(form) = descriptor.body else {
            panic!("expected multipart body");
        };
        let names: Vec<&str> = form.parts().iter().map(FormPart::name).collect();
        assert_eq!(names, ["nom_famille", "prenom"]);
    }

    #[tokio::test]
    async fn missing_upload_file_is_an_error() {
        let mut request = args("/api/activities/upload");
        request.file = vec![("image".to_owned(), "/nonexistent/photo.png".into())];
        assert!(build_mutation(request).await.is_err());
    }

    #[tokio::test]
    async fn token_round_trips_through_store() {
        let store = MemoryCookieStore::new();

        assert!(!token(&store, TokenAction::Get).await.unwrap());
        assert!(token(&store, TokenAction::Set { value: "abc".into() }).await.unwrap());
        assert_eq!(
            store.get(&CookieName::auth_token()).await.unwrap().as_deref(),
            Some("abc")
        );
        assert!(token(&store, TokenAction::Delete).await.unwrap());
        assert!(!token(&store, TokenAction::Get).await.unwrap());
    }

    #[tokio::test]
    async fn blank_token_is_refused() {
        let store = MemoryCookieStore::new();
        assert!(token(&store, TokenAction::Set { value: "  ".into() }).await.is_err());
    }
}
