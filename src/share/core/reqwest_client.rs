//! Reqwest-based implementation of the `LanzouHttpClient` trait.
//!
//! Two `reqwest::Client`s share one cookie jar: one follows redirects, the
//! other stops at the first 30x so the resolver can read `Location` itself.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, redirect::Policy};
use url::Url;

use super::transport::{
    HttpRequest, HttpResponse, LanzouHttpClient, MultipartField, RequestBody, TransportError,
};

/// Reqwest-backed transport with a persistent cookie jar.
pub struct ReqwestLanzouClient {
    client: Client,
    no_redirect_client: Client,
    jar: Arc<Jar>,
}

impl ReqwestLanzouClient {
    pub fn new() -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .build()
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        let no_redirect_client = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            no_redirect_client,
            jar,
        })
    }
}

#[async_trait]
impl LanzouHttpClient for ReqwestLanzouClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut builder = client
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .timeout(request.timeout);

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        let response = builder.send().await.map_err(|err| map_error(err, request))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| map_error(err, request))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            url,
        })
    }

    fn set_cookie(&self, url: &Url, name: &str, value: &str) {
        self.jar
            .add_cookie_str(&format!("{name}={value}; Path=/"), url);
    }

    fn remove_cookie(&self, url: &Url, name: &str) {
        self.jar
            .add_cookie_str(&format!("{name}=; Path=/; Max-Age=0"), url);
    }
}

fn build_form(fields: &[MultipartField]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartField::File {
                name,
                file_name,
                mime,
                data,
            } => {
                let part = Part::stream(data.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|err| TransportError::Transport(err.to_string()))?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

fn map_error(err: reqwest::Error, request: &HttpRequest) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(request.timeout)
    } else {
        TransportError::Transport(err.to_string())
    }
}
