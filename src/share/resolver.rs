//! Share resolution pipeline.
//!
//! Drives one share URL (plus optional password) through page fetch,
//! anti-bot handling, gate detection, the signed ajax request, and the final
//! redirect until a direct download URL comes out. Every exit is a
//! [`ResolutionResult`]; nothing in here returns an error to the caller.

use std::time::Duration;

use chrono::Utc;
use http::header::REFERER;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

use crate::modules::events::{ChallengeEvent, ExtractionFailureEvent, LanzouEvent, ResolutionEvent};

use super::core::{
    ExtractedMetadata, HttpResponse, MultiDomainHttp, PageSnapshot, RequestBody, RequestOptions,
    ResolutionResult, ShareRequest, ShareStatus,
};
use super::extractors::{
    DEFAULT_AJAX_PATH, ExtractionError, extract_ajax_path, extract_frame_path, extract_metadata,
    extract_password_sign, extract_signed_request, extract_unlocked_metadata,
    normalize::normalize_name, password_form_fields,
};
use super::solvers::{ACW_COOKIE_NAME, AcwScV2Solver, ChallengeSolver, DownloadVerification};
use super::url::{ShareUrlKind, classify_share_url, looks_like_file_page};

const REVOKED_MARKERS: [&str; 2] = ["文件取消", "文件不存在"];
const PASSWORD_MARKERS: [&str; 2] = ["id=\"pwdload\"", "id=\"passwddiv\""];

/// Cookie that lets the pre-redirect link answer with a plain 302.
const DOWN_IP_COOKIE: (&str, &str) = ("down_ip", "1");

/// How much of a page goes into extraction failure reports.
const EXCERPT_CHARS: usize = 600;

/// Internal failure of one pipeline step.
#[derive(Debug, Error)]
#[error("{status}: {reason}")]
pub(crate) struct ResolveFailure {
    status: ShareStatus,
    reason: String,
    metadata: Option<ExtractedMetadata>,
}

impl ResolveFailure {
    fn new(status: ShareStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            metadata: None,
        }
    }

    fn network(reason: impl Into<String>) -> Self {
        Self::new(ShareStatus::NetworkError, reason)
    }

    fn extraction(reason: impl Into<String>) -> Self {
        Self::new(ShareStatus::ExtractionFailed, reason)
    }

    /// Attach what was scraped so far, unless a step already did.
    fn with_metadata(mut self, metadata: &ExtractedMetadata) -> Self {
        if self.metadata.is_none() {
            self.metadata = Some(metadata.clone());
        }
        self
    }
}

type Step<T> = Result<T, ResolveFailure>;

/// JSON answer of the signed ajax request.
#[derive(Debug, Deserialize)]
struct LinkInfo {
    #[serde(default)]
    zt: Value,
    #[serde(default)]
    dom: Value,
    #[serde(default)]
    url: Value,
    #[serde(default)]
    inf: Value,
}

impl LinkInfo {
    fn is_ok(&self) -> bool {
        match &self.zt {
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => s == "1",
            _ => false,
        }
    }

    /// `dom + "/file/" + url`, the link that redirects to the real file.
    fn pseudo_url(&self) -> Option<String> {
        let dom = self.dom.as_str().filter(|s| !s.is_empty())?;
        let url = self.url.as_str().filter(|s| !s.is_empty())?;
        Some(format!("{dom}/file/{url}"))
    }

    fn file_name(&self) -> Option<&str> {
        self.inf.as_str().filter(|s| !s.is_empty())
    }
}

/// Resolves share links into direct download URLs.
pub struct ShareResolver {
    http: MultiDomainHttp,
    host_url: Url,
    verification_url: String,
    acw: AcwScV2Solver,
    verification: DownloadVerification,
}

impl ShareResolver {
    pub fn new(
        http: MultiDomainHttp,
        host_url: Url,
        verification_url: impl Into<String>,
        verification_delay: Duration,
    ) -> Self {
        Self {
            http,
            host_url,
            verification_url: verification_url.into(),
            acw: AcwScV2Solver::new(),
            verification: DownloadVerification::new(verification_delay),
        }
    }

    pub fn http(&self) -> &MultiDomainHttp {
        &self.http
    }

    /// Pause before the download verification POST.
    pub fn verification_delay(&self) -> Duration {
        self.verification.delay()
    }

    /// Resolve one share. The anti-bot cookie installed on the way is
    /// dropped again before returning.
    pub async fn resolve(&self, request: &ShareRequest) -> ResolutionResult {
        let kind = classify_share_url(&request.share_url);
        let result = match kind {
            ShareUrlKind::Rejected => ResolutionResult::failed(ShareStatus::InvalidUrl, None),
            _ => {
                let outcome = self.run(request, kind).await;
                self.forget_anti_bot_cookie(&request.share_url);
                match outcome {
                    Ok((metadata, direct_url)) => ResolutionResult::resolved(metadata, direct_url),
                    Err(failure) => {
                        log::debug!("resolution of {} stopped: {failure}", request.share_url);
                        ResolutionResult::failed(failure.status, failure.metadata)
                    }
                }
            }
        };

        self.http
            .events()
            .dispatch(LanzouEvent::Resolution(ResolutionEvent {
                share_url: request.share_url.clone(),
                status: result.status(),
                timestamp: Utc::now(),
            }));
        result
    }

    async fn run(&self, request: &ShareRequest, kind: ShareUrlKind) -> Step<(ExtractedMetadata, String)> {
        let (first, anti_bot_cookie) = self.fetch_share_page(request).await?;

        if kind == ShareUrlKind::NeedsProbe && !looks_like_file_page(first.cleaned()) {
            return Err(ResolveFailure::new(
                ShareStatus::InvalidUrl,
                "page is not a file share",
            ));
        }

        if REVOKED_MARKERS.iter().any(|m| first.cleaned().contains(m)) {
            return Err(ResolveFailure::new(ShareStatus::ShareRevoked, "share was cancelled"));
        }

        let password_gated = PASSWORD_MARKERS.iter().any(|m| first.cleaned().contains(m));
        let (mut metadata, pseudo_url) = if password_gated {
            self.password_branch(request, &first).await?
        } else {
            self.open_branch(request, &first).await?
        };
        metadata.anti_bot_cookie = anti_bot_cookie;

        let direct_url = self
            .follow_pseudo_link(&request.share_url, &pseudo_url)
            .await
            .map_err(|failure| failure.with_metadata(&metadata))?;
        Ok((metadata, direct_url))
    }

    /// Fetch the share page, solving the `acw_sc__v2` interstitial once if
    /// it shows up.
    async fn fetch_share_page(&self, request: &ShareRequest) -> Step<(PageSnapshot, Option<String>)> {
        let page = self.get_page(&request.share_url).await?;
        if !self.acw.is_challenge(&page) {
            return Ok((PageSnapshot::new(page), None));
        }

        let share_url = Url::parse(&request.share_url)
            .map_err(|err| ResolveFailure::new(ShareStatus::InvalidUrl, err.to_string()))?;
        let cookie = self.acw.solve(&page);
        log::debug!("set cookie {ACW_COOKIE_NAME}={cookie}");
        // The frame and ajax requests go to host_url, which may differ from the share host.
        self.http.set_cookie(&share_url, ACW_COOKIE_NAME, &cookie);
        self.http.set_cookie(&self.host_url, ACW_COOKIE_NAME, &cookie);

        let retried = self.get_page(&request.share_url).await?;
        self.emit_challenge(&request.share_url, self.acw.name(), !self.acw.is_challenge(&retried));
        Ok((PageSnapshot::new(retried), Some(cookie)))
    }

    async fn password_branch(
        &self,
        request: &ShareRequest,
        first: &PageSnapshot,
    ) -> Step<(ExtractedMetadata, String)> {
        if request.password.is_empty() {
            return Err(ResolveFailure::new(
                ShareStatus::SharePasswordRequired,
                "share is password protected",
            ));
        }

        let sign = extract_password_sign(first.cleaned())
            .ok_or_else(|| self.extraction_failure(&request.share_url, "sign", first))?;
        let ajax_path =
            extract_ajax_path(first.cleaned()).unwrap_or_else(|| DEFAULT_AJAX_PATH.to_string());

        let link = self
            .request_signed_link(
                &ajax_path,
                password_form_fields(&sign, &request.password),
                &request.share_url,
            )
            .await?;
        if !link.is_ok() {
            return Err(ResolveFailure::new(
                ShareStatus::SharePasswordWrong,
                format!("password rejected: {}", link.inf),
            ));
        }

        let second = PageSnapshot::new(self.get_page(&request.share_url).await?);
        let mut metadata = extract_unlocked_metadata(second.cleaned());
        metadata.signed_token = Some(sign);
        if let Some(name) = link.file_name() {
            metadata.set_name(normalize_name(name));
        }

        let pseudo_url = link.pseudo_url().ok_or_else(|| {
            ResolveFailure::extraction("signed link response lacks dom/url").with_metadata(&metadata)
        })?;
        Ok((metadata, pseudo_url))
    }

    async fn open_branch(
        &self,
        request: &ShareRequest,
        first: &PageSnapshot,
    ) -> Step<(ExtractedMetadata, String)> {
        let mut metadata = extract_metadata(first.cleaned());

        let frame_path = extract_frame_path(first.cleaned()).ok_or_else(|| {
            self.extraction_failure(&request.share_url, "frame", first)
                .with_metadata(&metadata)
        })?;
        let frame_url = self
            .host_url
            .join(&frame_path)
            .map_err(|err| ResolveFailure::extraction(err.to_string()).with_metadata(&metadata))?;

        let frame = self
            .get_page(frame_url.as_str())
            .await
            .map(PageSnapshot::new)
            .map_err(|failure| failure.with_metadata(&metadata))?;

        let signed = extract_signed_request(frame.cleaned(), request.wants_webpage_params())
            .map_err(|err| {
                let ExtractionError::MissingField(field) = err;
                self.extraction_failure(frame_url.as_str(), field, &frame)
                    .with_metadata(&metadata)
            })?;
        metadata.signed_token = Some(signed.sign.clone());

        let ajax_path =
            extract_ajax_path(frame.cleaned()).unwrap_or_else(|| DEFAULT_AJAX_PATH.to_string());
        let link = self
            .request_signed_link(&ajax_path, signed.form_fields(), &request.share_url)
            .await
            .map_err(|failure| failure.with_metadata(&metadata))?;

        if !link.is_ok() {
            return Err(ResolveFailure::extraction(format!(
                "signed link request rejected: {}",
                link.inf
            ))
            .with_metadata(&metadata));
        }
        let pseudo_url = link.pseudo_url().ok_or_else(|| {
            ResolveFailure::extraction("signed link response lacks dom/url").with_metadata(&metadata)
        })?;
        Ok((metadata, pseudo_url))
    }

    async fn request_signed_link(
        &self,
        ajax_path: &str,
        fields: Vec<(String, String)>,
        referer: &str,
    ) -> Step<LinkInfo> {
        let url = self
            .host_url
            .join(ajax_path)
            .map_err(|err| ResolveFailure::extraction(err.to_string()))?;
        let response = self
            .http
            .post(
                url.as_str(),
                RequestBody::Form(fields),
                RequestOptions::new().with_header(REFERER, referer),
            )
            .await
            .map_err(|err| ResolveFailure::network(err.to_string()))?;

        response.json::<LinkInfo>().map_err(|err| {
            let page = PageSnapshot::new(response.text());
            self.extraction_failure(url.as_str(), &format!("json ({err})"), &page)
        })
    }

    /// GET the pre-redirect link without following it and read the real
    /// location, passing the download verification when it interposes.
    async fn follow_pseudo_link(&self, share_url: &str, pseudo_url: &str) -> Step<String> {
        let target = Url::parse(pseudo_url)
            .map_err(|err| ResolveFailure::extraction(format!("bad pre-redirect url: {err}")))?;
        self.http
            .set_cookie(&target, DOWN_IP_COOKIE.0, DOWN_IP_COOKIE.1);

        let response = self
            .http
            .get(pseudo_url, RequestOptions::new().without_redirects())
            .await
            .map_err(|err| ResolveFailure::network(err.to_string()))?;

        let page = PageSnapshot::new(response.text());
        if self.verification.is_verification_page(page.cleaned()) {
            return self.pass_verification(share_url, &page).await;
        }

        let location = response
            .location()
            .ok_or_else(|| ResolveFailure::network("pre-redirect link answered without Location"))?;
        target
            .join(location)
            .map(String::from)
            .map_err(|err| ResolveFailure::network(format!("bad redirect location: {err}")))
    }

    async fn pass_verification(&self, share_url: &str, page: &PageSnapshot) -> Step<String> {
        let tokens = self
            .verification
            .parse_tokens(page.cleaned())
            .ok_or_else(|| self.extraction_failure(share_url, "verification tokens", page))?;

        // Posting before the delay is answered with a signature error.
        sleep(self.verification.delay()).await;

        let response = self
            .http
            .post(
                &self.verification_url,
                RequestBody::Form(tokens.form_fields()),
                RequestOptions::new(),
            )
            .await
            .map_err(|err| ResolveFailure::network(err.to_string()))?;

        let direct_url = response
            .json::<Value>()
            .ok()
            .and_then(|reply| reply.get("url").and_then(Value::as_str).map(str::to_string))
            .filter(|url| !url.is_empty());

        self.emit_challenge(share_url, self.verification.name(), direct_url.is_some());
        direct_url.ok_or_else(|| {
            let reply = PageSnapshot::new(response.text());
            self.extraction_failure(&self.verification_url, "url", &reply)
        })
    }

    async fn get_page(&self, url: &str) -> Step<String> {
        let response = self
            .http
            .get(url, RequestOptions::new())
            .await
            .map_err(|err| ResolveFailure::network(err.to_string()))?;
        ensure_page(url, response)
    }

    fn forget_anti_bot_cookie(&self, share_url: &str) {
        if let Ok(url) = Url::parse(share_url) {
            self.http.remove_cookie(&url, ACW_COOKIE_NAME);
        }
        self.http.remove_cookie(&self.host_url, ACW_COOKIE_NAME);
    }

    fn emit_challenge(&self, url: &str, challenge_type: &str, success: bool) {
        self.http.events().dispatch(LanzouEvent::Challenge(ChallengeEvent {
            url: url.to_string(),
            challenge_type: challenge_type.to_string(),
            success,
            timestamp: Utc::now(),
        }));
    }

    /// Report a missing field together with the start of the page it was
    /// looked for in.
    fn extraction_failure(&self, url: &str, field: &str, page: &PageSnapshot) -> ResolveFailure {
        self.http
            .events()
            .dispatch(LanzouEvent::ExtractionFailure(ExtractionFailureEvent {
                url: url.to_string(),
                field: field.to_string(),
                excerpt: page.raw().chars().take(EXCERPT_CHARS).collect(),
                timestamp: Utc::now(),
            }));
        ResolveFailure::extraction(format!("no {field} on {url}"))
    }
}

/// Error statuses and empty bodies count as no response.
fn ensure_page(url: &str, response: HttpResponse) -> Step<String> {
    if response.status >= 400 {
        return Err(ResolveFailure::network(format!(
            "{url} answered with status {}",
            response.status
        )));
    }
    let text = response.text();
    if text.is_empty() {
        return Err(ResolveFailure::network(format!("{url} answered with an empty page")));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;
    use http::header::HeaderMap;

    use super::*;
    use crate::modules::events::EventDispatcher;
    use crate::share::core::transport::stub::{StubClient, redirect, response};

    const SHARE_URL: &str = "https://pan.lanzouo.com/iAbcde1";
    const PSEUDO_URL: &str = "https://developer.lanzoug.com/file/?PseudoToken";
    const DIRECT_URL: &str = "https://down.example.com/demo.zip?sig=1";
    const LINK_OK: &str = r#"{"zt":1,"dom":"https://developer.lanzoug.com","url":"?PseudoToken","inf":0}"#;

    const OPEN_PAGE: &str = concat!(
        "<title>demo.zip - 蓝奏云</title>\n",
        "<div class=\"fileinfo\">\n",
        "<span class=\"p7\">文件大小：</span>2.5 M<br>\n",
        "<span class=\"p7\">上传时间：</span><font>2024-01-15</font><br>\n",
        "</div>\n",
        "<table><tr><td>文件描述：<br>\n a demo </td></tr></table>\n",
        "<!-- <iframe src=\"/fn?STALE\"></iframe> -->\n",
        "<iframe class=\"ifr2\" name=\"1\" src=\"/fn?FRAME1\" frameborder=\"0\"></iframe>\n",
    );

    const FRAME_PAGE: &str = concat!(
        "var wp_sign = 'SIGNSIGNSIGN_c_c';\n",
        "var ajaxdata = '?ctdf';\n",
        "$.ajax({ type : 'post', url : '/ajaxm.php?file=123',\n",
        "data : { 'action':'downprocess','signs':ajaxdata,'sign':wp_sign,'ves':1 },\n",
    );

    const PASSWORD_PAGE: &str = concat!(
        "<div id=\"pwdload\"><input id=\"pwd\"></div>\n",
        "var skdklds = 'PWDSIGN';\n",
        "url : '/ajaxm.php?file=456',\n",
    );

    const UNLOCKED_PAGE: &str = concat!(
        "<div class=\"n_filesize\">大小：1.2 M</div>\n",
        "<span class=\"n_file_infos\">2023-05-01</span>\n",
        "<div class=\"n_box_des\">top secret</div>\n",
    );

    fn resolver(stub: Arc<StubClient>) -> ShareResolver {
        resolver_with_delay(stub, Duration::ZERO)
    }

    fn resolver_with_delay(stub: Arc<StubClient>, delay: Duration) -> ShareResolver {
        let http = MultiDomainHttp::new(
            stub,
            Arc::new(EventDispatcher::new()),
            HeaderMap::new(),
            "lanzouo.com",
            vec!["lanzouw.com".into(), "lanzoui.com".into()],
            Duration::from_secs(15),
        );
        ShareResolver::new(
            http,
            Url::parse("https://pan.lanzouo.com").unwrap(),
            "https://vip.d0.baidupan.com/file/ajax.php",
            delay,
        )
    }

    fn script_gated_share_until_verification(stub: &StubClient) {
        stub.ok(Method::GET, SHARE_URL, PASSWORD_PAGE);
        stub.ok(Method::GET, SHARE_URL, UNLOCKED_PAGE);
        stub.ok(
            Method::POST,
            "https://pan.lanzouo.com/ajaxm.php?file=456",
            r#"{"zt":1,"dom":"https://developer.lanzoug.com","url":"?PseudoToken","inf":"secret*file.txt"}"#,
        );
        stub.ok(
            Method::GET,
            PSEUDO_URL,
            "<div>网络异常</div><script>data : {'file':'FTOKEN','el':el,'sign':'VSIGN'}</script>",
        );
    }

    fn script_open_share(stub: &StubClient) {
        stub.ok(Method::GET, SHARE_URL, OPEN_PAGE);
        stub.ok(Method::GET, "https://pan.lanzouo.com/fn?FRAME1", FRAME_PAGE);
        stub.ok(Method::POST, "https://pan.lanzouo.com/ajaxm.php?file=123", LINK_OK);
    }

    #[tokio::test]
    async fn rejects_bad_url_without_network() {
        let stub = Arc::new(StubClient::new());
        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new("https://pan.lanzouo.com/", ""))
            .await;
        assert_eq!(result.status(), ShareStatus::InvalidUrl);
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn open_share_resolves_through_redirect() {
        let stub = Arc::new(StubClient::new());
        script_open_share(&stub);
        stub.route(Method::GET, PSEUDO_URL, Ok(redirect(PSEUDO_URL, DIRECT_URL)));

        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, ""))
            .await;

        assert_eq!(result.status(), ShareStatus::Success);
        assert_eq!(result.direct_url(), Some(DIRECT_URL));
        let meta = result.metadata().unwrap();
        assert_eq!(meta.name, "demo.zip");
        assert_eq!(meta.size, "2.5 M");
        assert_eq!(meta.upload_time, "2024-01-15");
        assert_eq!(meta.description, "a demo");
        assert_eq!(meta.signed_token.as_deref(), Some("SIGNSIGNSIGN_c_c"));

        let requests = stub.requests();
        let post = requests.iter().find(|r| r.method == Method::POST).unwrap();
        assert_eq!(post.body.form_value("sign"), Some("SIGNSIGNSIGN_c_c"));
        assert_eq!(post.body.form_value("ves"), Some("1"));
        assert_eq!(post.headers.get(REFERER).unwrap(), SHARE_URL);

        let last = requests.last().unwrap();
        assert_eq!(last.url.as_str(), PSEUDO_URL);
        assert!(!last.follow_redirects);
        assert!(
            stub.cookies()
                .iter()
                .any(|(host, name, value)| host == "developer.lanzoug.com" && name == "down_ip" && value == "1")
        );
    }

    #[tokio::test]
    async fn password_gate_without_password_stops_early() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, PASSWORD_PAGE);

        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, ""))
            .await;

        assert_eq!(result.status(), ShareStatus::SharePasswordRequired);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn wrong_password_is_reported() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, PASSWORD_PAGE);
        stub.ok(
            Method::POST,
            "https://pan.lanzouo.com/ajaxm.php?file=456",
            r#"{"zt":0,"inf":"密码不正确"}"#,
        );

        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, "nope"))
            .await;

        assert_eq!(result.status(), ShareStatus::SharePasswordWrong);
        assert!(result.direct_url().is_none());
        let post = stub.requests().into_iter().find(|r| r.method == Method::POST).unwrap();
        assert_eq!(post.body.form_value("p"), Some("nope"));
        assert_eq!(post.body.form_value("sign"), Some("PWDSIGN"));
    }

    #[tokio::test]
    async fn password_share_passes_download_verification() {
        let stub = Arc::new(StubClient::new());
        script_gated_share_until_verification(&stub);
        stub.ok(
            Method::POST,
            "https://vip.d0.baidupan.com/file/ajax.php",
            r#"{"zt":1,"url":"https://direct.example.com/final.txt"}"#,
        );

        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, "1234"))
            .await;

        assert_eq!(result.status(), ShareStatus::Success);
        assert_eq!(result.direct_url(), Some("https://direct.example.com/final.txt"));
        let meta = result.metadata().unwrap();
        assert_eq!(meta.name, "secret_file.txt");
        assert_eq!(meta.file_type, "txt");
        assert_eq!(meta.size, "1.2 M");
        assert_eq!(meta.upload_time, "2023-05-01");
        assert_eq!(meta.description, "top secret");
        assert_eq!(meta.signed_token.as_deref(), Some("PWDSIGN"));

        let verification = stub.requests().pop().unwrap();
        assert_eq!(verification.body.form_value("file"), Some("FTOKEN"));
        assert_eq!(verification.body.form_value("el"), Some("2"));
        assert_eq!(verification.body.form_value("sign"), Some("VSIGN"));
    }

    #[tokio::test]
    async fn anti_bot_page_is_solved_once_and_cookie_dropped() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, ACW_PAGE);
        script_open_share(&stub);
        stub.route(Method::GET, PSEUDO_URL, Ok(redirect(PSEUDO_URL, DIRECT_URL)));

        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, ""))
            .await;

        assert_eq!(result.status(), ShareStatus::Success);
        assert_eq!(
            result.metadata().unwrap().anti_bot_cookie.as_deref(),
            Some("d2c7186598ab1a508a4f6064e4fa746323ab17c6")
        );
        let share_gets = stub
            .requests()
            .iter()
            .filter(|r| r.method == Method::GET && r.url.as_str() == SHARE_URL)
            .count();
        assert_eq!(share_gets, 2);
        assert!(stub.cookies().iter().all(|(_, name, _)| name != ACW_COOKIE_NAME));
    }

    #[tokio::test]
    async fn revoked_share_is_classified() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, "<div class=\"off\">来晚啦...文件取消分享了</div>");
        let result = resolver(stub).resolve(&ShareRequest::new(SHARE_URL, "")).await;
        assert_eq!(result.status(), ShareStatus::ShareRevoked);
    }

    #[tokio::test]
    async fn unreachable_share_is_network_error() {
        let stub = Arc::new(StubClient::new());
        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, ""))
            .await;
        assert_eq!(result.status(), ShareStatus::NetworkError);
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn missing_frame_keeps_partial_metadata() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, "<title>lonely.txt - 蓝奏云</title>");
        let result = resolver(stub).resolve(&ShareRequest::new(SHARE_URL, "")).await;
        assert_eq!(result.status(), ShareStatus::ExtractionFailed);
        assert_eq!(result.metadata().unwrap().name, "lonely.txt");
    }

    #[tokio::test]
    async fn webpage_mode_without_tokens_fails_extraction() {
        let url = "https://pan.lanzouo.com/iAbcde1?webpage=Xy12";
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, url, OPEN_PAGE);
        stub.ok(Method::GET, "https://pan.lanzouo.com/fn?FRAME1", FRAME_PAGE);

        let result = resolver(stub.clone()).resolve(&ShareRequest::new(url, "")).await;
        assert_eq!(result.status(), ShareStatus::ExtractionFailed);
        assert!(stub.requests().iter().all(|r| r.method == Method::GET));
    }

    #[tokio::test]
    async fn rejected_signed_request_fails_extraction() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, OPEN_PAGE);
        stub.ok(Method::GET, "https://pan.lanzouo.com/fn?FRAME1", FRAME_PAGE);
        stub.ok(
            Method::POST,
            "https://pan.lanzouo.com/ajaxm.php?file=123",
            r#"{"zt":0,"inf":"sign error"}"#,
        );
        let result = resolver(stub).resolve(&ShareRequest::new(SHARE_URL, "")).await;
        assert_eq!(result.status(), ShareStatus::ExtractionFailed);
    }

    #[tokio::test]
    async fn non_json_link_info_fails_extraction() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, OPEN_PAGE);
        stub.ok(Method::GET, "https://pan.lanzouo.com/fn?FRAME1", FRAME_PAGE);
        stub.ok(Method::POST, "https://pan.lanzouo.com/ajaxm.php?file=123", "<html>busy</html>");
        let result = resolver(stub).resolve(&ShareRequest::new(SHARE_URL, "")).await;
        assert_eq!(result.status(), ShareStatus::ExtractionFailed);
    }

    #[tokio::test]
    async fn redirect_without_location_is_network_error() {
        let stub = Arc::new(StubClient::new());
        script_open_share(&stub);
        stub.route(Method::GET, PSEUDO_URL, Ok(response(PSEUDO_URL, 200, "<html></html>")));
        let result = resolver(stub).resolve(&ShareRequest::new(SHARE_URL, "")).await;
        assert_eq!(result.status(), ShareStatus::NetworkError);
        assert_eq!(result.metadata().unwrap().name, "demo.zip");
    }

    #[tokio::test]
    async fn custom_url_is_probed_by_first_fetch() {
        let url = "https://vip.lanzouo.com/custom-share";
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, url, "<div class=\"folder\">not a file</div>");
        let result = resolver(stub.clone()).resolve(&ShareRequest::new(url, "")).await;
        assert_eq!(result.status(), ShareStatus::InvalidUrl);
        assert_eq!(stub.requests().len(), 1);
    }

    const ACW_PAGE: &str =
        "<html><script>var arg1='0123456789ABCDEF0123456789ABCDEF01234567'; acw_sc__v2</script></html>";

    #[tokio::test]
    async fn anti_bot_cookie_reaches_host_of_follow_up_requests() {
        let url = "https://wwa.lanzoui.com/iAbcde1";
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, url, ACW_PAGE);
        stub.ok(Method::GET, url, OPEN_PAGE);
        let resolver = resolver(stub.clone());

        let (page, cookie) = resolver
            .fetch_share_page(&ShareRequest::new(url, ""))
            .await
            .unwrap();
        assert!(page.cleaned().contains("fileinfo"));
        assert!(cookie.is_some());

        let hosts: Vec<String> = stub
            .cookies()
            .into_iter()
            .filter(|(_, name, _)| name == ACW_COOKIE_NAME)
            .map(|(host, _, _)| host)
            .collect();
        assert!(hosts.iter().any(|h| h == "wwa.lanzoui.com"));
        assert!(hosts.iter().any(|h| h == "pan.lanzouo.com"));

        resolver.forget_anti_bot_cookie(url);
        assert!(stub.cookies().iter().all(|(_, name, _)| name != ACW_COOKIE_NAME));
    }

    #[tokio::test]
    async fn failed_anti_bot_retry_is_network_error() {
        let stub = Arc::new(StubClient::new());
        stub.ok(Method::GET, SHARE_URL, ACW_PAGE);

        let result = resolver(stub.clone())
            .resolve(&ShareRequest::new(SHARE_URL, ""))
            .await;

        assert_eq!(result.status(), ShareStatus::NetworkError);
        // One challenge page, then the retry against every mirror.
        assert_eq!(stub.requests().len(), 4);
        assert!(stub.cookies().iter().all(|(_, name, _)| name != ACW_COOKIE_NAME));
    }

    #[tokio::test]
    async fn verification_reply_without_url_fails_extraction() {
        for reply in [r#"{"zt":1,"url":""}"#, r#"{"zt":0,"inf":"sign error"}"#] {
            let stub = Arc::new(StubClient::new());
            script_gated_share_until_verification(&stub);
            stub.ok(Method::POST, "https://vip.d0.baidupan.com/file/ajax.php", reply);

            let result = resolver(stub)
                .resolve(&ShareRequest::new(SHARE_URL, "1234"))
                .await;

            assert_eq!(result.status(), ShareStatus::ExtractionFailed, "reply {reply}");
            assert_eq!(result.metadata().unwrap().name, "secret_file.txt");
        }
    }

    #[tokio::test]
    async fn verification_waits_for_configured_delay() {
        let delay = Duration::from_millis(150);
        let stub = Arc::new(StubClient::new());
        script_gated_share_until_verification(&stub);
        stub.ok(
            Method::POST,
            "https://vip.d0.baidupan.com/file/ajax.php",
            r#"{"zt":1,"url":"https://direct.example.com/final.txt"}"#,
        );
        let resolver = resolver_with_delay(stub, delay);
        assert_eq!(resolver.verification_delay(), delay);

        let started = std::time::Instant::now();
        let result = resolver.resolve(&ShareRequest::new(SHARE_URL, "1234")).await;

        assert_eq!(result.status(), ShareStatus::Success);
        assert!(started.elapsed() >= delay);
    }
}
