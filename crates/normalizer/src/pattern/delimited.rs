//! 구분자(CSV) 패턴 -- 구분자와 인용 문자로 값을 나눠 위치별 필드에 대응시킵니다.
//!
//! 분리 규칙:
//! - 인용 문자는 필드 시작에서만 인용을 엽니다. 필드 중간의 인용 문자는 일반 문자입니다.
//! - 인용 구간 안의 구분자는 필드를 나누지 않습니다.
//! - 인용 구간 안의 인용 문자 두 개는 인용 문자 하나입니다.
//! - 닫히지 않은 인용 구간은 줄 끝까지 이어집니다.
//! - 인용되지 않은 필드 중간의 줄바꿈은 분리 실패입니다.

/// 기본 구분자
pub const DEFAULT_SEPARATOR: char = ',';

/// 기본 인용 문자
pub const DEFAULT_QUOTECHAR: char = '"';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StartField,
    InField,
    InQuoted,
    QuoteInQuoted,
}

/// 한 줄을 필드로 나눕니다.
///
/// 빈 줄은 빈 목록을 반환합니다. 분리할 수 없으면 `None`.
///
/// ```
/// use lognorm_normalizer::pattern::split_delimited;
///
/// let fields = split_delimited(r#"a,"b, c",d"#, ',', '"').unwrap();
/// assert_eq!(fields, vec!["a", "b, c", "d"]);
/// ```
pub fn split_delimited(line: &str, separator: char, quotechar: char) -> Option<Vec<String>> {
    if line.is_empty() {
        return Some(Vec::new());
    }

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut state = State::StartField;
    let mut chars = line.char_indices();

    while let Some((pos, c)) = chars.next() {
        let line_break = c == '\n' || c == '\r';
        match state {
            State::StartField | State::InField | State::QuoteInQuoted if line_break => {
                // 줄 끝의 개행은 허용, 그 뒤에 내용이 있으면 실패
                if line[pos..].chars().all(|c| c == '\n' || c == '\r') {
                    break;
                }
                return None;
            }
            State::StartField => {
                if c == quotechar {
                    state = State::InQuoted;
                } else if c == separator {
                    fields.push(String::new());
                } else {
                    current.push(c);
                    state = State::InField;
                }
            }
            State::InField => {
                if c == separator {
                    fields.push(std::mem::take(&mut current));
                    state = State::StartField;
                } else {
                    current.push(c);
                }
            }
            State::InQuoted => {
                if c == quotechar {
                    state = State::QuoteInQuoted;
                } else {
                    current.push(c);
                }
            }
            State::QuoteInQuoted => {
                if c == quotechar {
                    current.push(quotechar);
                    state = State::InQuoted;
                } else if c == separator {
                    fields.push(std::mem::take(&mut current));
                    state = State::StartField;
                } else {
                    current.push(c);
                    state = State::InField;
                }
            }
        }
    }

    fields.push(current);
    Some(fields)
}

/// 구분자 패턴의 열 배치
#[derive(Debug, Clone)]
pub struct DelimitedLayout {
    separator: char,
    quotechar: char,
    columns: Vec<String>,
}

impl DelimitedLayout {
    /// 패턴 텍스트를 구분자로 나눠 열 이름을 만듭니다.
    ///
    /// 구분자가 공백이 아니면 각 열 이름의 앞뒤 공백을 제거합니다.
    pub fn new(text: &str, separator: char, quotechar: char) -> Self {
        let columns = text
            .split(separator)
            .map(|c| {
                if separator == ' ' {
                    c.to_owned()
                } else {
                    c.trim().to_owned()
                }
            })
            .collect();
        Self {
            separator,
            quotechar,
            columns,
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn quotechar(&self) -> char {
        self.quotechar
    }

    /// 열 이름 (치환 토큰)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 값을 나눠 (열 이름, 값) 쌍을 만듭니다.
    ///
    /// 분리 실패, 빈 줄, 열 개수 불일치는 모두 `None`입니다.
    pub fn split(&self, value: &str) -> Option<Vec<(String, String)>> {
        let fields = split_delimited(value, self.separator, self.quotechar)?;
        if fields.is_empty() || fields.len() != self.columns.len() {
            return None;
        }
        Some(self.columns.iter().cloned().zip(fields).collect())
    }
}
