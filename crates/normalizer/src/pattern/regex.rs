//! 정규식 패턴 -- 치환 토큰을 이름 붙은 캡처 그룹으로 바꾸고 하나의 alternation으로 합칩니다.
//!
//! 룰셋의 모든 정규식 패턴은 패턴 이름 순서로 `|`로 연결되어 한 번만 컴파일됩니다.
//! 각 패턴 가지는 `pattern{i}` 그룹으로, 각 태그는 `tag{n}` 그룹으로 감싸지며
//! 그룹 이름은 룰셋 안에서 유일합니다.

use std::collections::HashMap;

use regex::Regex;

use crate::error::NormalizerError;
use crate::tag::Tag;
use crate::tag_type::RegexFlags;

use super::Pattern;

/// 패턴 텍스트 조각
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// 정규식 원문 그대로
    Literal(String),
    /// 태그 인덱스
    Tag(usize),
}

/// 치환 토큰 위치가 해석된 정규식 패턴 텍스트
#[derive(Debug, Clone)]
pub struct RegexLayout {
    segments: Vec<Segment>,
}

impl RegexLayout {
    /// 패턴 텍스트를 한 번 훑으며 치환 토큰을 찾습니다.
    ///
    /// 같은 위치에서 여러 토큰이 맞으면 가장 긴 토큰이 우선합니다.
    /// 한 토큰이 두 번 이상 나오면 에러입니다. 나오지 않는 토큰은 무시됩니다.
    pub(crate) fn parse(text: &str, tags: &[Tag]) -> Result<Self, String> {
        let mut tokens: Vec<(usize, &str)> = tags
            .iter()
            .enumerate()
            .map(|(idx, tag)| (idx, tag.substitute()))
            .collect();
        tokens.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let mut seen = vec![false; tags.len()];
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        'scan: while !rest.is_empty() {
            for &(idx, token) in &tokens {
                if !token.is_empty() && rest.starts_with(token) {
                    if seen[idx] {
                        return Err(format!(
                            "substitute '{token}' appears more than once in the pattern"
                        ));
                    }
                    seen[idx] = true;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Tag(idx));
                    rest = &rest[token.len()..];
                    continue 'scan;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                literal.push(c);
            }
            rest = chars.as_str();
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// 텍스트에 실제로 등장하는 태그 인덱스 (등장 순서)
    pub fn tag_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Tag(idx) => Some(*idx),
            Segment::Literal(_) => None,
        })
    }

    /// 태그 자리를 `(?P<tag{n}>...)` 그룹으로 바꾼 정규식을 만듭니다.
    fn render(&self, tags: &[Tag], mut on_group: impl FnMut(usize) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Tag(idx) => {
                    let group = on_group(*idx);
                    out.push_str(&format!("(?P<{group}>{})", tags[*idx].tag_type().regexp()));
                }
            }
        }
        out
    }
}

/// 매칭 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// 값의 시작에서 매칭
    #[default]
    Match,
    /// 값의 아무 위치에서 매칭
    Search,
}

/// 캡처 그룹 인덱스가 가리키는 대상
#[derive(Debug, Clone, Copy)]
enum GroupTarget {
    Unrelated,
    Pattern(usize),
    Tag { pattern: usize, tag: usize },
}

/// 통합 정규식 매칭 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnionMatch {
    /// 매칭된 패턴 인덱스
    pub pattern: usize,
    /// (태그 인덱스, 캡처 값) -- 참여한 그룹만, 캡처 순서
    pub values: Vec<(usize, String)>,
}

/// 룰셋의 모든 정규식 패턴을 합친 통합 정규식
#[derive(Debug, Clone)]
pub(crate) struct UnionRegex {
    regex: Regex,
    targets: Vec<GroupTarget>,
}

impl UnionRegex {
    /// 정규식 패턴들로 통합 정규식을 만듭니다. 정규식 패턴이 없으면 `None`.
    ///
    /// `patterns`는 이미 이름 순으로 정렬되어 있어야 합니다.
    pub(crate) fn build(
        rule_set: &str,
        patterns: &[Pattern],
        flags: RegexFlags,
        match_type: MatchType,
    ) -> Result<Option<Self>, NormalizerError> {
        let mut names: HashMap<String, GroupTarget> = HashMap::new();
        let mut branches = Vec::new();
        let mut counter = 0usize;

        for (p_idx, pattern) in patterns.iter().enumerate() {
            let Some(layout) = pattern.regex_layout() else {
                continue;
            };
            let body = layout.render(pattern.tags(), |tag| {
                let group = format!("tag{counter}");
                counter += 1;
                names.insert(group.clone(), GroupTarget::Tag { pattern: p_idx, tag });
                group
            });
            let group = format!("pattern{p_idx}");
            names.insert(group.clone(), GroupTarget::Pattern(p_idx));
            branches.push(format!("(?P<{group}>{body})"));
        }

        if branches.is_empty() {
            return Ok(None);
        }

        let alternation = branches.join("|");
        let full = match match_type {
            MatchType::Match => format!(r"\A(?:{alternation})"),
            MatchType::Search => alternation,
        };
        let regex = flags
            .compile(&full)
            .map_err(|e| NormalizerError::InvalidPattern {
                name: rule_set.to_owned(),
                reason: format!("combined pattern does not compile: {e}"),
            })?;

        let targets = regex
            .capture_names()
            .map(|name| {
                name.and_then(|n| names.get(n).copied())
                    .unwrap_or(GroupTarget::Unrelated)
            })
            .collect();

        Ok(Some(Self { regex, targets }))
    }

    /// 값에 매칭해 첫 번째로 매칭된 패턴과 태그 값을 반환합니다.
    pub(crate) fn find(&self, value: &str) -> Option<UnionMatch> {
        let caps = self.regex.captures(value)?;

        let pattern = self
            .targets
            .iter()
            .enumerate()
            .find_map(|(idx, target)| match target {
                GroupTarget::Pattern(p) if caps.get(idx).is_some() => Some(*p),
                _ => None,
            })?;

        let values = self
            .targets
            .iter()
            .enumerate()
            .filter_map(|(idx, target)| match target {
                GroupTarget::Tag { pattern: p, tag } if *p == pattern => {
                    caps.get(idx).map(|m| (*tag, m.as_str().to_owned()))
                }
                _ => None,
            })
            .collect();

        Some(UnionMatch { pattern, values })
    }

    /// 컴파일된 통합 정규식 원문
    pub(crate) fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::description::Descriptions;
    use crate::tag_type::TagType;

    fn tag(name: &str, substitute: &str, regexp: &str) -> Tag {
        let tt = TagType::new(format!("{name}Type"), "string", regexp, RegexFlags::default())
            .unwrap();
        Tag::new(name, Arc::new(tt), substitute, vec![], Descriptions::new())
    }

    #[test]
    fn parse_prefers_longest_token() {
        let tags = vec![tag("date", "DATE", ".*"), tag("datetime", "DATETIME", ".*")];
        let layout = RegexLayout::parse("DATETIME DATE", &tags).unwrap();
        let indices: Vec<_> = layout.tag_indices().collect();
        assert_eq!(indices, vec![1, 0]);
    }

    #[test]
    fn parse_rejects_repeated_substitute() {
        let tags = vec![tag("a", "A_TOKEN", ".*")];
        let err = RegexLayout::parse("A_TOKEN and A_TOKEN", &tags).unwrap_err();
        assert!(err.contains("A_TOKEN"));
    }

    #[test]
    fn parse_ignores_missing_substitute() {
        let tags = vec![tag("a", "MISSING", ".*")];
        let layout = RegexLayout::parse("no tokens here", &tags).unwrap();
        assert_eq!(layout.tag_indices().count(), 0);
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        // 태그 정규식 안의 문자열이 다른 토큰과 같아도 다시 치환되지 않습니다.
        let tags = vec![tag("a", "AAA", "BBB"), tag("b", "BBB", ".*")];
        let layout = RegexLayout::parse("AAA", &tags).unwrap();
        let rendered = layout.render(&tags, |idx| format!("g{idx}"));
        assert_eq!(rendered, "(?P<g0>BBB)");
    }

    #[test]
    fn render_uses_tag_type_regexp() {
        let tags = vec![tag("pid", "PID", r"\d+")];
        let layout = RegexLayout::parse(r"\[PID\]", &tags).unwrap();
        assert_eq!(layout.render(&tags, |_| "tag0".to_owned()), r"\[(?P<tag0>\d+)\]");
    }
}
