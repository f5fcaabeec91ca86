//! printf-style rendering of a single reading
//!
//! Format templates in function metadata are written for the printf family
//! (`%.1f°C`, `%.0f%%`). Only one argument ever exists, the reading itself.
//!
//! Rendering never fails. Problems are reported inside the output:
//!
//! - unsupported verb: `%!d(float64=21.5)`
//! - second verb with no argument left: `%!f(MISSING)`
//! - template without any verb: `...%!(EXTRA float64=21.5)`
//! - `%` at the very end, or a width or precision too long to be a number:
//!   `%!(NOVERB)`
//! - argument index other than `[1]`: `%!f(BADINDEX)`
//! - precision above 65535: `%!(BADPREC)`
//!
//! Supported verbs are `f F e E g G v` with the flags `+ - space 0 #`, a
//! width and a precision. `%%` is a literal percent sign. `%[1]f` refers to
//! the reading explicitly and may repeat it. `*` widths and the hexadecimal
//! float verbs are not supported and render as unsupported verbs.

use std::fmt::Write;

/// Numbers in a directive stop being digits past this
const MAX_NUMBER: usize = 1_000_000;

/// Largest precision the float formatting machinery accepts
const MAX_PRECISION: usize = u16::MAX as usize;

/// Flags, width and precision of one verb
#[derive(Debug, Default, Clone, Copy)]
struct Directive {
    plus: bool,
    minus: bool,
    space: bool,
    zero: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Render `template` with `value` as its only argument
pub fn render(template: &str, value: f64) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len() + 8);
    let mut consumed = false;
    let mut reordered = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.get(i) {
            match flag {
                '+' => directive.plus = true,
                '-' => directive.minus = true,
                ' ' => directive.space = true,
                '0' => directive.zero = true,
                '#' => directive.sharp = true,
                _ => break,
            }
            i += 1;
        }

        let mut index = parse_index(&chars, &mut i);

        let Some((width, next)) = parse_number(&chars, i) else {
            out.push_str("%!(NOVERB)");
            break;
        };
        directive.width = width;
        i = next;
        if chars.get(i) == Some(&'.') {
            let Some((precision, next)) = parse_number(&chars, i + 1) else {
                out.push_str("%!(NOVERB)");
                break;
            };
            directive.precision = Some(precision.unwrap_or(0));
            i = next;
        }

        if index.is_none() {
            index = parse_index(&chars, &mut i);
        }

        let Some(&verb) = chars.get(i) else {
            out.push_str("%!(NOVERB)");
            break;
        };
        i += 1;

        if verb == '%' {
            out.push('%');
            continue;
        }
        match index {
            Some(Ok(())) => {
                reordered = true;
                consumed = false;
            }
            Some(Err(())) => {
                reordered = true;
                let _ = write!(out, "%!{verb}(BADINDEX)");
                continue;
            }
            None => {}
        }
        if consumed {
            let _ = write!(out, "%!{verb}(MISSING)");
            continue;
        }
        consumed = true;

        match verb {
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'v' => {
                if directive.precision.is_some_and(|p| p > MAX_PRECISION) {
                    out.push_str("%!(BADPREC)");
                } else {
                    out.push_str(&format_float(value, verb, directive));
                }
            }
            _ => {
                let _ = write!(out, "%!{verb}(float64={})", general_value(value));
            }
        }
    }

    if !consumed && !reordered {
        let _ = write!(out, "%!(EXTRA float64={})", general_value(value));
    }
    out
}

/// The value as `%v` renders it
fn general_value(value: f64) -> String {
    format_float(value, 'v', Directive::default())
}

/// Digits starting at `i`; `None` when the number is too long to be real
fn parse_number(chars: &[char], mut i: usize) -> Option<(Option<usize>, usize)> {
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.get(i).and_then(|c| c.to_digit(10)) {
        let current = number.unwrap_or(0);
        if current > MAX_NUMBER {
            return None;
        }
        number = Some(current * 10 + digit as usize);
        i += 1;
    }
    Some((number, i))
}

/// An explicit argument index such as `[1]`; `Ok` when it names the reading
fn parse_index(chars: &[char], i: &mut usize) -> Option<Result<(), ()>> {
    if chars.get(*i) != Some(&'[') {
        return None;
    }
    let Some(close) = chars[*i..].iter().position(|&c| c == ']') else {
        *i += 1;
        return Some(Err(()));
    };
    let digits: String = chars[*i + 1..*i + close].iter().collect();
    *i += close + 1;
    match digits.parse::<usize>() {
        Ok(1) => Some(Ok(())),
        _ => Some(Err(())),
    }
}

fn format_float(value: f64, verb: char, directive: Directive) -> String {
    let negative = value.is_sign_negative() && !value.is_nan();

    let (sign, body, numeric) = if value.is_nan() {
        let sign = if directive.plus {
            "+"
        } else if directive.space {
            " "
        } else {
            ""
        };
        (sign, "NaN".to_string(), false)
    } else if value.is_infinite() {
        let sign = if negative {
            "-"
        } else if directive.space && !directive.plus {
            " "
        } else {
            "+"
        };
        (sign, "Inf".to_string(), false)
    } else {
        let sign = if negative {
            "-"
        } else if directive.plus {
            "+"
        } else if directive.space {
            " "
        } else {
            ""
        };
        let abs = value.abs();
        let body = match verb {
            'e' | 'E' => exponent(
                abs,
                directive.precision.unwrap_or(6),
                verb == 'E',
                directive.sharp,
            ),
            'g' | 'G' => general(abs, directive.precision, verb == 'G'),
            'v' => general(abs, directive.precision, false),
            _ => fixed(abs, directive.precision.unwrap_or(6), directive.sharp),
        };
        (sign, body, true)
    };

    pad(sign, &body, directive, numeric)
}

fn pad(sign: &str, body: &str, directive: Directive, numeric: bool) -> String {
    let len = sign.chars().count() + body.chars().count();
    let width = directive.width.unwrap_or(0);
    if len >= width {
        return format!("{sign}{body}");
    }
    let fill = width - len;
    if directive.minus {
        format!("{sign}{body}{}", " ".repeat(fill))
    } else if directive.zero && numeric {
        format!("{sign}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{sign}{body}", " ".repeat(fill))
    }
}

/// `%f` of a non-negative finite value
fn fixed(abs: f64, precision: usize, sharp: bool) -> String {
    let mut out = format!("{abs:.precision$}");
    if sharp && precision == 0 {
        out.push('.');
    }
    out
}

/// `%e` of a non-negative finite value
fn exponent(abs: f64, precision: usize, upper: bool, sharp: bool) -> String {
    let mut out = exponent_notation(&format!("{abs:.precision$e}"), upper);
    if sharp && precision == 0 {
        if let Some(pos) = out.find(['e', 'E']) {
            out.insert(pos, '.');
        }
    }
    out
}

/// `%g` of a non-negative finite value
///
/// Without a precision the shortest representation that round-trips is
/// used and exponent form kicks in at exponents below -4 or from 6 up.
fn general(abs: f64, precision: Option<usize>, upper: bool) -> String {
    match precision {
        None => {
            let scientific = format!("{abs:e}");
            let (_, exp) = decimal_digits(&scientific);
            if exp < -4 || exp >= 6 {
                exponent_notation(&scientific, upper)
            } else {
                // Display never uses exponents and prints the shortest digits
                format!("{abs}")
            }
        }
        Some(precision) => {
            let precision = precision.max(1);
            let rounded = format!("{abs:.prec$e}", prec = precision - 1);
            let (digits, exp) = decimal_digits(&rounded);
            let significant = digits.trim_end_matches('0').len().max(1);
            let point = exp + 1;

            let mut eprec = precision as i32;
            if eprec > significant as i32 && significant as i32 >= point {
                eprec = significant as i32;
            }
            if exp < -4 || exp >= eprec {
                let shown = precision.min(significant);
                exponent(abs, shown - 1, upper, false)
            } else {
                let shown = if precision as i32 > point {
                    significant as i32
                } else {
                    precision as i32
                };
                fixed(abs, (shown - point).max(0) as usize, false)
            }
        }
    }
}

/// Split Rust exponent output (`2.5e-3`) into its digits (`25`) and exponent
fn decimal_digits(scientific: &str) -> (String, i32) {
    let (mantissa, exp) = scientific.split_once('e').unwrap_or((scientific, "0"));
    let digits = mantissa.chars().filter(char::is_ascii_digit).collect();
    (digits, exp.parse().unwrap_or(0))
}

/// Turn Rust exponent output (`2.5e-3`) into printf style (`2.5e-03`)
fn exponent_notation(scientific: &str, upper: bool) -> String {
    let (mantissa, exp) = scientific.split_once('e').unwrap_or((scientific, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let marker = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{marker}{sign}{:02}", exp.unsigned_abs())
}
