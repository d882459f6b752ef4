//! Platform detection from release asset filenames.
//!
//! OS and architecture patterns are checked independently against the
//! lowercased filename, each in its listed priority order. Names only match
//! as whole tokens, delimited by anything that isn't a letter or digit.

use lazy_static::lazy_static;
use regex::Regex;

const TOKEN_START: &str = r"(?:^|[^a-z0-9])";
const TOKEN_END: &str = r"(?:[^a-z0-9]|$)";

fn token(alternatives: &str) -> String {
    format!("{}(?:{}){}", TOKEN_START, alternatives, TOKEN_END)
}

lazy_static! {
    static ref OS_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("darwin", Regex::new(&token("darwin|macos|osx|apple")).unwrap()),
        (
            "windows",
            Regex::new(&format!(r"{}|\.exe{}", token("windows|win64|win32"), TOKEN_END)).unwrap(),
        ),
        ("linux", Regex::new(&token("linux")).unwrap()),
    ];
    static ref ARCH_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("arm64", Regex::new(&token("aarch64|arm64")).unwrap()),
        ("x64", Regex::new(&token("x86_64|amd64|x64")).unwrap()),
        ("x86", Regex::new(&token("i386|i686|x86")).unwrap()),
        ("arm", Regex::new(&token("armv7|arm")).unwrap()),
    ];
}

fn first_match(patterns: &[(&'static str, Regex)], filename: &str) -> Option<&'static str> {
    patterns
        .iter()
        .find(|(_, re)| re.is_match(filename))
        .map(|(label, _)| *label)
}

/// `os-arch`, `os`, or `None` when no OS token is present.
pub fn detect_platform(filename: &str) -> Option<String> {
    let lowered = filename.to_lowercase();
    let os = first_match(&OS_PATTERNS, &lowered)?;
    match first_match(&ARCH_PATTERNS, &lowered) {
        Some(arch) => Some(format!("{}-{}", os, arch)),
        None => Some(os.to_string()),
    }
}

/// Distinct platforms across a set of filenames, in first-seen order.
pub fn detect_platforms<'a>(filenames: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for platform in filenames.into_iter().filter_map(detect_platform) {
        if !out.contains(&platform) {
            out.push(platform);
        }
    }
    out
}
