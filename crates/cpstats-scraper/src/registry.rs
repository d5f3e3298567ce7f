//! Extractor registry: the built-in platform table and its resolution against
//! the operator's handles.
//!
//! Pattern lists are ordered by how likely they are to match each site's
//! current markup. Older layouts stay at the tail so a site rollback or A/B
//! test still resolves without a code change.

use cpstats_core::{
    expand_template, ApiExtraction, ApiRequest, ApiSpec, HandleConfig, PatternSpec, PlatformSpec,
    RatingSpec, SanityBounds,
};
use serde_json::json;

use crate::error::ScraperError;
use crate::extract::Extractor;

const LEETCODE_QUERY: &str = "query getUserProfile($username: String!) { matchedUser(username: $username) { submitStats { acSubmissionNum { count } } } }";

/// All platform definitions known to this build, by name.
#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    specs: Vec<PlatformSpec>,
}

impl ExtractorRegistry {
    /// The built-in table with `max_count` as every platform's exclusive ceiling.
    #[must_use]
    pub fn builtin(max_count: u32) -> Self {
        Self {
            specs: builtin_specs(max_count),
        }
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&PlatformSpec> {
        self.specs.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Ordered extraction patterns for `name`. `None` means the caller asked
    /// for a platform that does not exist.
    #[must_use]
    pub fn patterns_for(&self, name: &str) -> Option<&[PatternSpec]> {
        self.spec(name).map(|s| s.patterns.as_slice())
    }

    pub fn specs(&self) -> impl Iterator<Item = &PlatformSpec> {
        self.specs.iter()
    }

    /// Build the run set for the configured handles, applying per-handle
    /// overrides and compiling every pattern.
    ///
    /// # Errors
    ///
    /// Any configuration problem is fatal and surfaces before network I/O:
    /// [`ScraperError::UnknownPlatform`], [`ScraperError::InvalidTemplate`],
    /// or [`ScraperError::InvalidPattern`].
    pub fn resolve(&self, handles: &[HandleConfig]) -> Result<Vec<Platform>, ScraperError> {
        handles
            .iter()
            .map(|handle| {
                let mut spec = self
                    .spec(&handle.platform)
                    .ok_or_else(|| ScraperError::UnknownPlatform(handle.platform.clone()))?
                    .clone();

                if let Some(template) = &handle.endpoint_template {
                    spec.endpoint_template.clone_from(template);
                }
                if let Some(max) = handle.max_count {
                    spec.bounds = spec.bounds.with_max(max);
                }

                Platform::compile(spec, &handle.username)
            })
            .collect()
    }
}

/// A platform ready to fetch: its definition, the handle to fetch for, and
/// compiled extractors.
#[derive(Debug, Clone)]
pub struct Platform {
    spec: PlatformSpec,
    username: String,
    extractors: Vec<Extractor>,
}

impl Platform {
    /// Validate templates and compile patterns for one handle.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidTemplate`] or
    /// [`ScraperError::InvalidPattern`].
    pub fn compile(spec: PlatformSpec, username: &str) -> Result<Self, ScraperError> {
        validate_template(&spec.name, &spec.endpoint_template, true)?;
        if let Some(api) = &spec.api {
            validate_template(&spec.name, &api.url_template, api.request.username_in_url())?;
        }
        if let Some(rating) = &spec.rating {
            validate_template(&spec.name, &rating.url_template, true)?;
        }

        let extractors = spec
            .patterns
            .iter()
            .map(|p| Extractor::compile(&spec.name, p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            spec,
            username: username.to_string(),
            extractors,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn spec(&self) -> &PlatformSpec {
        &self.spec
    }

    #[must_use]
    pub fn bounds(&self) -> &SanityBounds {
        &self.spec.bounds
    }

    #[must_use]
    pub fn extractors(&self) -> &[Extractor] {
        &self.extractors
    }

    #[must_use]
    pub fn page_url(&self) -> String {
        expand_template(&self.spec.endpoint_template, &self.username)
    }

    #[must_use]
    pub fn api_url(&self) -> Option<String> {
        self.spec
            .api
            .as_ref()
            .map(|api| expand_template(&api.url_template, &self.username))
    }

    #[must_use]
    pub fn rating_url(&self) -> Option<String> {
        self.spec
            .rating
            .as_ref()
            .map(|rating| expand_template(&rating.url_template, &self.username))
    }
}

/// A usable template is an absolute http(s) URL that still parses once the
/// placeholders are filled. Endpoints that take the username in the request
/// body (GraphQL) need no placeholder.
fn validate_template(
    platform: &str,
    template: &str,
    needs_placeholder: bool,
) -> Result<(), ScraperError> {
    let invalid = |reason: String| ScraperError::InvalidTemplate {
        platform: platform.to_string(),
        reason,
    };

    if needs_placeholder
        && !template.contains("{username}")
        && !template.contains("{username_lower}")
    {
        return Err(invalid(format!("\"{template}\" has no {{username}} placeholder")));
    }

    let sample = expand_template(template, "sample");
    let url = reqwest::Url::parse(&sample).map_err(|e| invalid(format!("\"{template}\": {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "\"{template}\" must use http or https, not {}",
            url.scheme()
        )));
    }

    Ok(())
}

fn page_only(
    name: &str,
    endpoint: &str,
    bounds: SanityBounds,
    patterns: Vec<PatternSpec>,
) -> PlatformSpec {
    PlatformSpec {
        name: name.to_string(),
        endpoint_template: endpoint.to_string(),
        api: None,
        patterns,
        bounds,
        rating: None,
    }
}

fn with_api(
    mut spec: PlatformSpec,
    url_template: &str,
    request: ApiRequest,
    extraction: ApiExtraction,
) -> PlatformSpec {
    spec.api = Some(ApiSpec {
        url_template: url_template.to_string(),
        request,
        extraction,
    });
    spec
}

fn regexes(patterns: &[&str]) -> Vec<PatternSpec> {
    patterns.iter().map(|p| PatternSpec::regex(p)).collect()
}

#[allow(clippy::too_many_lines)]
fn builtin_specs(max_count: u32) -> Vec<PlatformSpec> {
    let positive = SanityBounds::positive(max_count);
    let non_negative = SanityBounds::non_negative(max_count);

    let mut codeforces = with_api(
        page_only(
            "Codeforces",
            "https://codeforces.com/profile/{username}",
            positive,
            regexes(&[
                r#"class="_UserActivityFrame_counterValue">\s*(\d+)\s+problems"#,
                r"Problems\s+solved:\s*(\d+)",
                r#"class="problem-count">\s*(\d+)\s*<"#,
                r#""solvedProblemCount"\s*:\s*(\d+)"#,
                r#""solvedProblems"\s*:\s*(\d+)"#,
                r"var\s+solvedProblems\s*=\s*(\d+)",
            ]),
        ),
        "https://codeforces.com/api/user.status?handle={username}&from=1&count=20000",
        ApiRequest::Get,
        ApiExtraction::DistinctAccepted {
            items: "/result".to_string(),
            verdict: "/verdict".to_string(),
            accepted: json!("OK"),
            key: vec!["/problem/contestId".to_string(), "/problem/index".to_string()],
        },
    );
    codeforces.rating = Some(RatingSpec {
        url_template: "https://codeforces.com/api/user.info?handles={username}".to_string(),
        current: "/result/0/rating".to_string(),
        max: "/result/0/maxRating".to_string(),
        rank: "/result/0/rank".to_string(),
        max_rank: "/result/0/maxRank".to_string(),
    });

    let leetcode = with_api(
        page_only(
            "LeetCode",
            "https://leetcode.com/{username}/",
            positive,
            regexes(&[
                r#""solvedProblem"\s*:\s*(\d+)"#,
                r#"Solved["\s:]+(\d+)"#,
                r"<span[^>]*>(\d+)</span>\s*<span[^>]*>Solved</span>",
                r"(\d+)\s+/\s+\d+\s+Solved",
                r#"data-solved["\s:=]+(\d+)"#,
            ]),
        ),
        "https://leetcode.com/graphql",
        ApiRequest::GraphQl {
            query: LEETCODE_QUERY.to_string(),
        },
        ApiExtraction::Field {
            pointer: "/data/matchedUser/submitStats/acSubmissionNum/0/count".to_string(),
        },
    );

    let vjudge = page_only(
        "Vjudge",
        "https://vjudge.net/user/{username}",
        positive,
        regexes(&[
            r#"<a[^>]*title="Overall solved[^"]*"[^>]*>(\d+)</a>"#,
            r"Solved[:\s]*<[^>]*>(\d+)",
            r"Solved[:\s]*(\d+)",
            r"<a[^>]*>(\d+)</a>[^<]*Solved",
            r#"solved["\s:=]+(\d+)"#,
            r#"data-solved["\s:=]+(\d+)"#,
            r#""solved"\s*:\s*(\d+)"#,
        ]),
    );

    let atcoder = with_api(
        page_only(
            "AtCoder",
            "https://atcoder.jp/users/{username}",
            non_negative,
            regexes(&[
                r"(\d+)\s+AC",
                r"AC[:\s]+(\d+)",
                r"<td[^>]*>(\d+)</td>\s*<td[^>]*>AC</td>",
                r#""ac"\s*:\s*(\d+)"#,
                r#"data-ac["\s:=]+(\d+)"#,
            ]),
        ),
        // At most 500 submissions per response.
        "https://kenkoooo.com/atcoder/atcoder-api/v3/user/submissions?user={username_lower}",
        ApiRequest::Paged {
            cursor_param: "from_second".to_string(),
            cursor_pointer: "/epoch_second".to_string(),
            max_pages: 50,
        },
        ApiExtraction::DistinctAccepted {
            items: String::new(),
            verdict: "/result".to_string(),
            accepted: json!("AC"),
            key: vec!["/problem_id".to_string()],
        },
    );

    let mut codechef_patterns = vec![
        PatternSpec::regex(r"Total\s+Problems\s+Solved\s*:\s*(\d+)"),
        PatternSpec::regex_dot_all(r"Total\s+Problems\s+Solved\s*</[^>]+>\s*(\d+)"),
        PatternSpec::regex_on_text(r"Total\s+Problems\s+Solved\s*:\s*(\d+)"),
        PatternSpec::regex_on_text(r"Total\s+Problems\s+Solved\s*</[^>]+>\s*(\d+)"),
    ];
    codechef_patterns.extend(
        [
            r"<h3>.*?Problems\s+Solved.*?</h3>\s*<div[^>]*>\s*<b>(\d+)</b>",
            r"Problems\s+Solved[:\s]*</.*?>\s*<.*?>(\d+)</.*?>",
            r"<div[^>]*>\s*Problems\s+Solved\s*</div>\s*<div[^>]*>\s*(\d+)",
            r"<article[^>]*>.*?<h3>Problems.*?Solved</h3>.*?<div[^>]*>.*?<b>(\d+)</b>",
            r"problems-solved[^>]*>.*?(\d+)",
            r"fully\s+solved.*?(\d+)",
            r#""problemsSolved"\s*:\s*(\d+)"#,
            r#"data-problems["\s:=]+(\d+)"#,
            r"problem[s]?\s+solved[:\s]*(\d+)",
            r"<span[^>]*>(\d+)</span>\s*<[^>]*>\s*Problems\s+Solved",
        ]
        .iter()
        .map(|p| PatternSpec::regex_dot_all(p)),
    );
    let codechef = page_only(
        "CodeChef",
        "https://www.codechef.com/users/{username}",
        non_negative,
        codechef_patterns,
    );

    let cses = page_only(
        "CSES",
        "https://cses.fi/user/{username}/",
        positive,
        regexes(&[
            r"(\d+)\s+/\s+\d+\s+task",
            r"Solved:\s*(\d+)",
            r"<td[^>]*>(\d+)</td>\s*<td[^>]*>/\s*\d+\s+task",
            r#""solved"\s*:\s*(\d+)"#,
            r#"data-solved["\s:=]+(\d+)"#,
        ]),
    );

    let toph = page_only(
        "Toph",
        "https://toph.co/u/{username}",
        positive,
        vec![
            PatternSpec::labeled("div.title", "Solutions", "div.value"),
            PatternSpec::regex_on_text(r"(\d+)\s+Solutions"),
        ],
    );

    let lightoj = page_only(
        "LightOJ",
        "https://lightoj.com/user/{username}",
        positive,
        regexes(&[
            r"Solved[:\s]*(\d+)",
            r"Problems\s+Solved[:\s]*(\d+)",
            r"<span[^>]*>(\d+)</span>\s*<[^>]*>\s*Solved",
            r#""solved"\s*:\s*(\d+)"#,
            r#"data-solved["\s:=]+(\d+)"#,
        ]),
    );

    let spoj = page_only(
        "SPOJ",
        "https://www.spoj.com/users/{username}/",
        positive,
        regexes(&[
            r"Problems\s+solved[:\s]*(\d+)",
            r"<td[^>]*>Problems\s+solved[:\s]*</td>\s*<td[^>]*>(\d+)",
            r"solved[:\s]*</td>\s*<td[^>]*>(\d+)",
            r"Solved[:\s]*(\d+)",
            r#""solved"\s*:\s*(\d+)"#,
            r#"data-solved["\s:=]+(\d+)"#,
        ]),
    );

    let hackerrank = page_only(
        "HackerRank",
        "https://www.hackerrank.com/{username}",
        positive,
        regexes(&[
            r"(\d+)\s+challenges?\s+solved",
            r"challenges?\s+solved[:\s]*(\d+)",
            r"<span[^>]*>(\d+)</span>\s*<[^>]*>\s*challenges?\s+solved",
            r#""challengesSolved"\s*:\s*(\d+)"#,
            r#"data-challenges["\s:=]+(\d+)"#,
        ]),
    );

    let uva = with_api(
        page_only(
            "UVa",
            "https://uhunt.onlinejudge.org/id/{username}",
            positive,
            regexes(&[
                r"Solved[:\s]*(\d+)",
                r"<td[^>]*>Solved[:\s]*</td>\s*<td[^>]*>(\d+)",
                r#""solved"\s*:\s*(\d+)"#,
                r#"data-solved["\s:=]+(\d+)"#,
            ]),
        ),
        "https://uhunt.onlinejudge.org/api/subs-user/{username}",
        ApiRequest::Get,
        ApiExtraction::DistinctAccepted {
            items: "/subs".to_string(),
            verdict: "/2".to_string(),
            accepted: json!(90),
            key: vec!["/1".to_string()],
        },
    );

    let hackerearth = page_only(
        "HackerEarth",
        "https://www.hackerearth.com/@{username}",
        positive,
        regexes(&[
            r"(\d+)\s+problem",
            r"Problems\s+Solved[:\s]*(\d+)",
            r"<span[^>]*>(\d+)</span>\s*<[^>]*>\s*problem",
            r#""problemsSolved"\s*:\s*(\d+)"#,
            r#"data-problems["\s:=]+(\d+)"#,
        ]),
    );

    let kattis = page_only(
        "Kattis",
        "https://open.kattis.com/users/{username}",
        positive,
        regexes(&[
            r"(\d+)\s+problems?\s+solved",
            r"Solved[:\s]*(\d+)",
            r"Problems\s+solved[:\s]*(\d+)",
            r#"data-solved["\s:=]+(\d+)"#,
        ]),
    );

    // Both render client-side; a static fetch only succeeds when the server
    // pre-renders, otherwise the snapshot carries the value.
    let csacademy = page_only(
        "CSAcademy",
        "https://csacademy.com/user/{username}",
        positive,
        regexes(&[
            r#"<span style="font-size: 1\.3em; margin-bottom: 10px;">Problems solved:\s*(\d+)</span>"#,
            r"(\d+)\s+problems?\s+solved",
            r"Solved[:\s]*(\d+)",
            r"Problems\s+solved[:\s]*(\d+)",
            r#"data-solved["\s:=]+(\d+)"#,
            r"(\d+)\s+problems",
            r"Problems[:\s]*(\d+)",
        ]),
    );

    let toki = page_only(
        "Toki",
        "https://tlx.toki.id/profiles/{username}",
        positive,
        vec![
            PatternSpec::regex_dot_all(r"<li[^>]*>.*?<b[^>]*>AC</b>.*?:.*?(\d+).*?</li>"),
            PatternSpec::regex(r"<li[^>]*>\s*<b[^>]*>\s*AC\s*</b>\s*:\s*(\d+)\s*</li>"),
            PatternSpec::regex(r"AC\s*:\s*(\d+)"),
            PatternSpec::regex(r"(\d+)\s+problems?\s+solved"),
            PatternSpec::regex(r"Solved[:\s]*(\d+)"),
            PatternSpec::regex(r"Problems\s+solved[:\s]*(\d+)"),
            PatternSpec::regex(r#"data-solved["\s:=]+(\d+)"#),
        ],
    );

    vec![
        codeforces,
        leetcode,
        vjudge,
        atcoder,
        codechef,
        cses,
        toph,
        lightoj,
        spoj,
        hackerrank,
        uva,
        hackerearth,
        kattis,
        csacademy,
        toki,
    ]
}
