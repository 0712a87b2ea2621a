use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_PREFECTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:東京都|北海道|京都府|大阪府|[一-龠々]{2,3}県)").unwrap());

static RE_KANJI_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([一二三四五六七八九十]+)(丁目|番)").unwrap());

/// 住所の正規化（マスタ照合用の正準形）
///
/// 同一地点が年度ごとに表記ゆれで収録されるため、照合前に必ずこの形へ揃える。
/// 純粋関数であり、正規化済み文字列を再度通しても変化しない。
///
/// 1. 全角英数記号を半角へ
/// 2. 空白（半角・全角）を除去
/// 3. `city_name` より前（都道府県など）と `city_name` 自身を除去
/// 4. ハイフン表記ゆれを `-` に統一
/// 5. 丁目・番の漢数字を算用数字へ
/// 6. ハイフン省略形を展開（`上用賀6-103-7` → `上用賀6丁目103番7`）
/// 7. 「外」（ほか数筆の印）を除去
pub fn normalize_address(address: &str, city_name: &str) -> String {
    let mut s = halfwidth(address);
    s.retain(|c| !c.is_whitespace());

    if !city_name.is_empty() {
        if let Some(idx) = s.find(city_name) {
            s = s[idx + city_name.len()..].to_string();
        }
    }
    let s = RE_PREFECTURE.replace(&s, "").into_owned();

    let s = s.replace(['－', '−', '‐'], "-");

    let s = RE_KANJI_SEGMENT
        .replace_all(&s, |caps: &Captures| match kanji_to_u32(&caps[1]) {
            Some(n) => format!("{}{}", n, &caps[2]),
            None => caps[0].to_string(),
        })
        .into_owned();

    let s = expand_hyphen_form(&s);

    s.replace('外', "").trim().to_string()
}

/// 全角英数記号（U+FF01〜U+FF5E）を対応する半角文字へ写す
pub fn halfwidth(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '！'..='～' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// 「町名-丁目-番地」のハイフン省略形を丁目・番の明示形へ展開する。
/// 2分割は丁目なしの「町名-番地」とみなす。4分割以上はそのまま残す。
fn expand_hyphen_form(s: &str) -> String {
    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
        [town, chou, banchi] => format!("{town}丁目{chou}番{banchi}"),
        [town, banchi] => format!("{town}番{banchi}"),
        _ => s.to_string(),
    }
}

fn kanji_digit(c: char) -> Option<u32> {
    "一二三四五六七八九"
        .chars()
        .position(|k| k == c)
        .map(|i| i as u32 + 1)
}

fn single_kanji(s: &str) -> Option<u32> {
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    kanji_digit(c)
}

/// 一〜四十九の漢数字をパースする（丁目・番地で現実に現れる範囲）
fn kanji_to_u32(s: &str) -> Option<u32> {
    match s.split_once('十') {
        Some((tens, ones)) => {
            let t = if tens.is_empty() { 1 } else { single_kanji(tens)? };
            let o = if ones.is_empty() { 0 } else { single_kanji(ones)? };
            Some(t * 10 + o)
        }
        None => single_kanji(s),
    }
}
