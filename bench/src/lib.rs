/// Builds a long, valid expression mixing every operator, negation and
/// nested parentheses. `terms` is the number of summed terms; they are
/// grouped in parenthesized runs to stay within the parser's depth limit.
pub fn big_input(terms: usize) -> String {
    const RUN: usize = 64;

    let mut src = String::with_capacity(terms * 32);
    for i in 0..terms {
        if i % RUN == 0 {
            if i > 0 {
                src.push_str(") + ");
            }
            src.push('(');
        } else {
            src.push_str(if i % 2 == 0 { " + " } else { " - " });
        }
        let n = i % 97 + 1;
        src.push_str(&format!("({n} * -(7 - {n}) / (1 + 2 * 3))"));
    }
    if terms > 0 {
        src.push(')');
    }
    src
}
