use std::io;

use crate::codegen::Lowered;

const DEFAULT_CODE_CAPACITY: usize = 1024;

/// Renders the instruction list as a C translation unit whose `main`
/// declares each temporary in definition order and returns the result.
pub fn render(lowered: &Lowered) -> String {
    let mut buf = Vec::with_capacity(DEFAULT_CODE_CAPACITY);
    Emitter::new(&mut buf).emit(lowered);
    String::from_utf8(buf).expect("generated code is ascii")
}

pub struct Emitter<W> {
    writer: W,
    indent: bool,
}

impl<W> Emitter<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Emitter<W> {
        Emitter {
            writer,
            indent: false,
        }
    }

    pub fn emit(mut self, lowered: &Lowered) {
        self.out("int main() {");
        self.indented(|this| {
            for instr in lowered.instrs() {
                this.out(format_args!("int {} = {};", instr.dest, instr.rhs));
            }
            this.out(format_args!("return {};", lowered.result()));
        });
        self.out("}");
    }
}

/// Utility functions.
impl<W> Emitter<W>
where
    W: io::Write,
{
    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) {
        let indent = if self.indent { "\t" } else { "" };
        writeln!(self.writer, "{indent}{f}").expect("Failed to write to sink");
    }

    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        res
    }
}
