use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusty_bigint::BigInt;
use tracing::{debug, instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// radix the operands are written in and the results are printed in
    #[arg(short, long, default_value_t = 10, global = true)]
    radix: u32,

    /// print results as big endian two's complement bytes in hex
    #[arg(short, long, default_value_t = false, global = true)]
    bytes: bool,

    /// log at debug level, ignoring RUST_LOG
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    #[command(subcommand)]
    op: Op,
}

/// Two operands, either may be negative
#[derive(clap::Args, Debug)]
struct Binary {
    #[arg(allow_hyphen_values = true)]
    a: String,
    #[arg(allow_hyphen_values = true)]
    b: String,
}

#[derive(clap::Args, Debug)]
struct Unary {
    #[arg(allow_hyphen_values = true)]
    a: String,
}

/// An operand and a bit count, either may be negative
#[derive(clap::Args, Debug)]
struct Shift {
    #[arg(allow_hyphen_values = true)]
    a: String,
    #[arg(allow_hyphen_values = true)]
    n: i64,
}

#[derive(Subcommand, Debug)]
enum Op {
    /// a + b
    Add(Binary),
    /// a - b
    Sub(Binary),
    /// a * b
    Mul(Binary),
    /// truncating quotient and remainder of a / b, one per line
    DivRem(Binary),
    /// least non-negative residue of a modulo b
    Mod(Binary),
    /// a raised to a non-negative power
    Pow {
        #[arg(allow_hyphen_values = true)]
        base: String,
        #[arg(allow_hyphen_values = true)]
        exponent: i64,
    },
    /// base raised to exponent modulo m, a negative exponent inverts the base
    ModPow {
        #[arg(allow_hyphen_values = true)]
        base: String,
        #[arg(allow_hyphen_values = true)]
        exponent: String,
        #[arg(allow_hyphen_values = true)]
        m: String,
    },
    /// greatest common divisor
    Gcd(Binary),
    /// floor of the square root
    Sqrt(Unary),
    /// a * 2^n
    Shl(Shift),
    /// floor(a / 2^n)
    Shr(Shift),
    /// a & b
    And(Binary),
    /// a | b
    Or(Binary),
    /// a ^ b
    Xor(Binary),
    /// !a, that is -a - 1
    Not(Unary),
    /// bits in the minimal two's complement form, excluding the sign bit
    BitLength(Unary),
    /// the minimal two's complement byte encoding of a
    Bytes(Unary),
}

fn parse(s: &str, radix: u32) -> Result<BigInt> {
    BigInt::from_str_radix(s, radix).with_context(|| format!("Parsing {s:?} in radix {radix}."))
}

/// Evaluate one operation, returning its results in output order
#[instrument(level = "debug", skip(op))]
fn evaluate(op: Op, radix: u32) -> Result<Vec<BigInt>> {
    let p = |s: &str| parse(s, radix);

    let results = match op {
        Op::Add(Binary { a, b }) => vec![p(&a)? + p(&b)?],
        Op::Sub(Binary { a, b }) => vec![p(&a)? - p(&b)?],
        Op::Mul(Binary { a, b }) => vec![p(&a)? * p(&b)?],
        Op::DivRem(Binary { a, b }) => {
            let (q, r) = p(&a)?.divide_and_remainder(&p(&b)?)?;
            vec![q, r]
        }
        Op::Mod(Binary { a, b }) => vec![p(&a)?.modulo(&p(&b)?)?],
        Op::Pow { base, exponent } => vec![p(&base)?.pow(exponent)?],
        Op::ModPow { base, exponent, m } => vec![p(&base)?.mod_pow(&p(&exponent)?, &p(&m)?)?],
        Op::Gcd(Binary { a, b }) => vec![p(&a)?.gcd(&p(&b)?)],
        Op::Sqrt(Unary { a }) => vec![p(&a)?.sqrt()?],
        Op::Shl(Shift { a, n }) => vec![p(&a)?.shift_left(n)],
        Op::Shr(Shift { a, n }) => vec![p(&a)?.shift_right(n)],
        Op::And(Binary { a, b }) => vec![p(&a)? & p(&b)?],
        Op::Or(Binary { a, b }) => vec![p(&a)? | p(&b)?],
        Op::Xor(Binary { a, b }) => vec![p(&a)? ^ p(&b)?],
        Op::Not(Unary { a }) => vec![!p(&a)?],
        Op::BitLength(Unary { a }) => vec![BigInt::from(p(&a)?.bit_length())],
        Op::Bytes(Unary { a }) => vec![p(&a)?],
    };

    Ok(results)
}

fn render(value: &BigInt, radix: u32, bytes: bool) -> Result<String> {
    if bytes {
        Ok(value
            .to_be_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    } else {
        Ok(value.to_str_radix(radix)?)
    }
}

fn main() -> Result<()> {
    let args: Args = Args::try_parse()?;

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let bytes = args.bytes || matches!(args.op, Op::Bytes(_));
    let results = evaluate(args.op, args.radix)?;
    debug!(count = results.len(), "evaluated");

    for value in &results {
        println!("{}", render(value, args.radix, bytes)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(argv: &[&str]) -> Result<Vec<String>> {
        let args = Args::try_parse_from(std::iter::once("bigint_calc").chain(argv.iter().copied()))?;
        let bytes = args.bytes || matches!(args.op, Op::Bytes(_));
        evaluate(args.op, args.radix)?
            .iter()
            .map(|v| render(v, args.radix, bytes))
            .collect()
    }

    #[test]
    fn test_arith_subcommands() -> Result<()> {
        assert_eq!(run(&["add", "5", "-3"])?, ["2"]);
        assert_eq!(run(&["sub", "-5", "3"])?, ["-8"]);
        assert_eq!(run(&["mul", "-4", "-4"])?, ["16"]);
        assert_eq!(run(&["div-rem", "7", "-2"])?, ["-3", "1"]);
        assert_eq!(run(&["mod", "-7", "3"])?, ["2"]);
        assert_eq!(run(&["pow", "2", "64"])?, ["18446744073709551616"]);
        assert_eq!(run(&["mod-pow", "4", "13", "497"])?, ["445"]);
        assert_eq!(run(&["gcd", "12", "-18"])?, ["6"]);
        assert_eq!(run(&["sqrt", "99"])?, ["9"]);
        Ok(())
    }

    #[test]
    fn test_bit_subcommands() -> Result<()> {
        assert_eq!(run(&["shl", "1", "4"])?, ["16"]);
        assert_eq!(run(&["shr", "-1", "5"])?, ["-1"]);
        assert_eq!(run(&["shl", "16", "-4"])?, ["1"]);
        assert_eq!(run(&["and", "12", "10"])?, ["8"]);
        assert_eq!(run(&["or", "12", "10"])?, ["14"]);
        assert_eq!(run(&["xor", "12", "10"])?, ["6"]);
        assert_eq!(run(&["not", "0"])?, ["-1"]);
        assert_eq!(run(&["bit-length", "-129"])?, ["8"]);
        Ok(())
    }

    #[test]
    fn test_radix_and_bytes() -> Result<()> {
        assert_eq!(run(&["--radix", "16", "add", "ff", "1"])?, ["100"]);
        assert_eq!(run(&["-r", "2", "add", "101", "-1"])?, ["100"]);
        assert_eq!(run(&["bytes", "-129"])?, ["ff7f"]);
        assert_eq!(run(&["--bytes", "add", "127", "1"])?, ["0080"]);
        Ok(())
    }

    #[test]
    fn test_errors() {
        assert!(run(&["div-rem", "1", "0"]).is_err());
        assert!(run(&["add", "1", "x"]).is_err());
        assert!(run(&["--radix", "40", "add", "1", "1"]).is_err());
        assert!(run(&["sqrt", "-4"]).is_err());
        assert!(run(&["mod", "5", "-3"]).is_err());
    }
}
