//! `Content-Disposition` of a multipart part: `form-data; name="..."[; filename="..."]`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Disposition {
    pub(crate) name: String,
    pub(crate) filename: Option<String>,
}

/// Parses a part's disposition value.
///
/// Parameters other than `name` and `filename` are skipped. An empty `filename`
/// means no file was chosen, so the part is a plain field.
pub(crate) fn parse(value: &str) -> Option<Disposition> {
    let kind_end = value.find(';').unwrap_or(value.len());
    if !value[..kind_end].trim().eq_ignore_ascii_case("form-data") {
        return None;
    }

    let mut name = None;
    let mut filename = None;

    let mut rest = &value[kind_end..];
    while let Some(param) = rest.trim_start().strip_prefix(';') {
        let param = param.trim_start();
        let eq = param.find('=')?;
        let key = param[..eq].trim();
        let (param_value, remaining) = parse_value(&param[eq + 1..])?;

        if key.eq_ignore_ascii_case("name") {
            name = Some(param_value);
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(param_value);
        }
        rest = remaining;
    }

    if !rest.trim().is_empty() {
        return None;
    }

    let name = name.filter(|name| !name.is_empty())?;
    Some(Disposition { name, filename: filename.filter(|filename| !filename.is_empty()) })
}

/// Reads a quoted string or a token, returning it with the unparsed remainder.
///
/// Backslashes inside quotes are kept verbatim, browsers send windows paths that way.
fn parse_value(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    if let Some(quoted) = input.strip_prefix('"') {
        let end = quoted.find('"')?;
        return Some((quoted[..end].to_string(), &quoted[end + 1..]));
    }

    let end = input.find(';').unwrap_or(input.len());
    let token = input[..end].trim();
    if token.is_empty() {
        return None;
    }
    Some((token.to_string(), &input[end..]))
}
