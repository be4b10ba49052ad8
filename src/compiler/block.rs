//! Control-flow constructs and branch relaxation.
//!
//! A method body is compiled in whole passes. Each construct opens a branch frame whose
//! labels are remembered across passes by construct ordinal, so a forward branch can be
//! sized from where its target landed last time. Every branch and pushed address is a
//! "site" whose encoded width only ever grows; once a pass ends at the same offset as
//! the one before, no site changed and every recorded label is exact.

use tracing::{debug, trace, warn};

use crate::bytecode::{self, VarKind};
use crate::cursor::Position;
use crate::token::{LookKind, Span, TokenKind};
use crate::varint;

use super::emit::undefined_symbol;
use super::{CompileError, Compiler, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    If,
    Case,
    CaseFast,
    Repeat,
    Look,
}

// Label slots. IF clause `n` uses slot `n`; CASE match group `n` uses slot `n + 1`.
const END: usize = 0;
const NEXT: usize = 0;
const QUIT: usize = 1;
const LOOP: usize = 2;

/// Interpreter stack bytes a QUIT discards for each loop form.
const COUNT_LOOP_BYTES: u32 = 4;
const VAR_LOOP_BYTES: u32 = 16;
/// Interpreter stack bytes a CASE or CASE_FAST holds while one of its blocks runs.
const CASE_BYTES: u32 = 4;

type FrameId = usize;

#[derive(Debug)]
struct BranchFrame {
    kind: FrameKind,
    labels: Vec<Option<usize>>,
    stack_bytes: u32,
    quit_bytes: u32,
}

#[derive(Debug, Default)]
pub(crate) struct BlockState {
    frames: Vec<BranchFrame>,
    open: Vec<FrameId>,
    next_frame: usize,
    widths: Vec<usize>,
    next_site: usize,
}

impl BlockState {
    fn begin_pass(&mut self) {
        self.open.clear();
        self.next_frame = 0;
        self.next_site = 0;
    }
}

/// Where the parts of a CASE / CASE_FAST live in the token stream.
#[derive(Debug, Default)]
struct CaseArms {
    /// Position just past each match line's colon, with the line's column.
    bodies: Vec<(Position, u32)>,
    other: Option<(Position, u32)>,
    end: Position,
}

impl Compiler<'_> {
    // ── Relaxation ───────────────────────────────────────────────────

    /// Run `body` from the current cursor and image offset until its layout stops moving.
    pub(super) fn relax<F>(&mut self, mut body: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        let start = self.cursor.mark();
        let origin = self.image.offset();
        self.blocks = BlockState::default();
        let mut previous = None;

        for pass in 1..=self.config.max_relaxation_passes {
            self.cursor.reset(start);
            let span = self.cursor.span();
            self.image
                .set_offset(origin)
                .map_err(|e| CompileError::from_image(e, span))?;
            self.blocks.begin_pass();

            body(self)?;

            let end = self.image.offset();
            let sites = self.blocks.widths.len();
            debug!(pass, origin, end, sites, "relaxation pass");
            if sites == 0 || previous == Some(end) {
                return Ok(());
            }
            previous = Some(end);
        }

        warn!(
            passes = self.config.max_relaxation_passes,
            "branch relaxation did not converge"
        );
        Err(CompileError::internal(
            "SPN-I001",
            self.cursor.span(),
            "Branch relaxation did not converge",
        ))
    }

    fn open_frame(&mut self, kind: FrameKind, span: Span) -> Result<FrameId> {
        if self.blocks.open.len() >= self.config.block_nest_limit {
            return Err(CompileError::limit(
                "SPN-K005",
                span,
                format!("Blocks nested deeper than {} levels", self.config.block_nest_limit),
            ));
        }
        let id = self.blocks.next_frame;
        self.blocks.next_frame += 1;
        match self.blocks.frames.get_mut(id) {
            Some(frame) if frame.kind == kind => {
                frame.stack_bytes = 0;
                frame.quit_bytes = 0;
            }
            Some(_) => {
                return Err(CompileError::internal(
                    "SPN-I003",
                    span,
                    "Construct order changed between relaxation passes",
                ));
            }
            None => self.blocks.frames.push(BranchFrame {
                kind,
                labels: Vec::new(),
                stack_bytes: 0,
                quit_bytes: 0,
            }),
        }
        self.blocks.open.push(id);
        trace!(id, ?kind, "open frame");
        Ok(id)
    }

    fn close_frame(&mut self) {
        self.blocks.open.pop();
    }

    fn frame_mut(&mut self, id: FrameId) -> Option<&mut BranchFrame> {
        self.blocks.frames.get_mut(id)
    }

    fn label(&self, frame: FrameId, slot: usize) -> Option<usize> {
        self.blocks.frames.get(frame)?.labels.get(slot).copied().flatten()
    }

    fn place_label(&mut self, frame: FrameId, slot: usize) {
        let here = self.image.offset();
        if let Some(frame) = self.frame_mut(frame) {
            if frame.labels.len() <= slot {
                frame.labels.resize(slot + 1, None);
            }
            frame.labels[slot] = Some(here);
        }
    }

    /// Index and current width of the next branch or address site of this pass.
    fn next_site(&mut self) -> (usize, usize) {
        let site = self.blocks.next_site;
        self.blocks.next_site += 1;
        if self.blocks.widths.len() <= site {
            self.blocks.widths.resize(site + 1, 1);
        }
        (site, self.blocks.widths[site])
    }

    /// `prefix` followed by an RFVARS displacement to a frame label.
    fn emit_branch(&mut self, prefix: &[u8], frame: FrameId, slot: usize) -> Result<()> {
        let (site, width) = self.next_site();
        let origin = self.image.offset();
        // an unseen label sits right after the branch until a pass places it
        let target = self.label(frame, slot).unwrap_or(origin + prefix.len() + width);
        let span = self.cursor.previous_span();
        let bytes = bytecode::branch_bytes(prefix, origin, target, width).ok_or_else(|| {
            CompileError::new(ErrorKind::Range, "SPN-R001", span, "Branch target out of range")
        })?;
        self.blocks.widths[site] = bytes.len() - prefix.len();
        self.emit(&bytes)
    }

    /// Push of a frame label's address.
    fn emit_address(&mut self, frame: FrameId, slot: usize) -> Result<()> {
        let (site, width) = self.next_site();
        let address = self.label(frame, slot).unwrap_or(0) as u32;
        let bytes = bytecode::address_bytes(address, width);
        self.blocks.widths[site] = bytes.len() - 1;
        self.emit(&bytes)
    }

    // ── Lines and statements ─────────────────────────────────────────

    /// Compile lines until one is indented no deeper than `parent` (or the stream ends).
    pub(super) fn compile_lines(&mut self, parent: Option<u32>) -> Result<()> {
        loop {
            let token = self.cursor.peek();
            match token.kind {
                TokenKind::EndFile => return Ok(()),
                TokenKind::End => {
                    self.cursor.advance();
                    continue;
                }
                _ => {}
            }
            if parent.is_some_and(|column| token.column <= column) {
                return Ok(());
            }
            self.compile_statement(token.column)?;
        }
    }

    /// One statement. `column` is the indentation its nested lines are measured against.
    fn compile_statement(&mut self, column: u32) -> Result<()> {
        let token = self.cursor.peek();
        match &token.kind {
            TokenKind::If | TokenKind::IfNot => self.compile_if(column),
            TokenKind::Case => self.compile_case(column),
            TokenKind::CaseFast => self.compile_case_fast(column),
            TokenKind::Repeat => self.compile_repeat(column),
            TokenKind::Next | TokenKind::Quit => self.compile_next_quit(),
            TokenKind::Return => {
                self.cursor.advance();
                self.emit(&[bytecode::BC_RETURN_RESULTS])?;
                self.expect_end()
            }
            TokenKind::Abort => {
                self.cursor.advance();
                self.emit(&[bytecode::BC_ABORT_0])?;
                self.expect_end()
            }
            TokenKind::Local | TokenKind::Var => self.compile_assignment(),
            TokenKind::Ident(name) => Err(undefined_symbol(name, token.span)),
            TokenKind::ElseIf | TokenKind::ElseIfNot | TokenKind::Else => Err(CompileError::syntax(
                "SPN-S005",
                token.span,
                format!("{} without an IF at the same indentation", token.kind.describe()),
            )),
            TokenKind::Other => Err(CompileError::syntax(
                "SPN-S006",
                token.span,
                "OTHER outside of a CASE block",
            )),
            TokenKind::While | TokenKind::Until => Err(CompileError::syntax(
                "SPN-S013",
                token.span,
                format!("{} without a REPEAT at the same indentation", token.kind.describe()),
            )),
            other => Err(CompileError::syntax(
                "SPN-S011",
                token.span,
                format!("Expected a statement, found {}", other.describe()),
            )),
        }
    }

    fn compile_assignment(&mut self) -> Result<()> {
        let (kind, offset) = self.expect_variable()?;
        self.expect(TokenKind::Assign)?;
        self.emit_expression()?;
        self.emit_variable(kind, offset, bytecode::VAR_WRITE)?;
        self.expect_end()
    }

    fn expect_variable(&mut self) -> Result<(VarKind, u32)> {
        let token = self.cursor.advance();
        match token.kind {
            TokenKind::Local => Ok((VarKind::Local, token.value)),
            TokenKind::Var => Ok((VarKind::Var, token.value)),
            TokenKind::Ident(name) => Err(undefined_symbol(&name, token.span)),
            other => Err(CompileError::syntax(
                "SPN-S016",
                token.span,
                format!("Expected a variable, found {}", other.describe()),
            )),
        }
    }

    // ── IF ───────────────────────────────────────────────────────────

    fn compile_if(&mut self, column: u32) -> Result<()> {
        let keyword = self.cursor.advance();
        let frame = self.open_frame(FrameKind::If, keyword.span)?;
        let mut negate = keyword.kind == TokenKind::IfNot;
        let mut clause = 1;
        let mut elseifs = 0;

        loop {
            self.emit_expression()?;
            self.expect_end()?;
            let skip = if negate { bytecode::BC_JNZ } else { bytecode::BC_JZ };
            self.emit_branch(&[skip], frame, clause)?;
            self.compile_lines(Some(column))?;

            let next = self.cursor.peek();
            let aligned = next.column == column;
            match next.kind {
                TokenKind::ElseIf | TokenKind::ElseIfNot if aligned => {
                    elseifs += 1;
                    if elseifs > self.config.elseif_limit {
                        return Err(CompileError::limit(
                            "SPN-K002",
                            next.span,
                            format!("IF block has more than {} ELSEIF clauses", self.config.elseif_limit),
                        ));
                    }
                    self.emit_branch(&[bytecode::BC_JMP], frame, END)?;
                    self.place_label(frame, clause);
                    self.cursor.advance();
                    negate = next.kind == TokenKind::ElseIfNot;
                    clause += 1;
                }
                TokenKind::Else if aligned => {
                    self.emit_branch(&[bytecode::BC_JMP], frame, END)?;
                    self.place_label(frame, clause);
                    self.cursor.advance();
                    self.expect_end()?;
                    self.compile_lines(Some(column))?;
                    break;
                }
                _ => {
                    self.place_label(frame, clause);
                    break;
                }
            }
        }

        self.place_label(frame, END);
        self.close_frame();
        Ok(())
    }

    // ── CASE ─────────────────────────────────────────────────────────

    fn compile_case(&mut self, column: u32) -> Result<()> {
        let keyword = self.cursor.advance();
        let frame = self.open_frame(FrameKind::Case, keyword.span)?;
        self.emit_address(frame, END)?;
        self.emit_expression()?;
        self.expect_end()?;

        let arms = self.scan_case_arms(column, keyword.span, |c, group| {
            loop {
                c.emit_expression()?;
                if c.cursor.peek_kind() == TokenKind::DotDot {
                    c.cursor.advance();
                    c.emit_expression()?;
                    c.emit_branch(&[bytecode::BC_CASE_RANGE], frame, group + 1)?;
                } else {
                    c.emit_branch(&[bytecode::BC_CASE_VALUE], frame, group + 1)?;
                }
                if c.cursor.peek_kind() != TokenKind::Comma {
                    return Ok(());
                }
                c.cursor.advance();
            }
        })?;

        if let Some(frame) = self.frame_mut(frame) {
            frame.stack_bytes = CASE_BYTES;
        }
        if let Some((pos, arm_column)) = arms.other {
            self.cursor.reset(pos);
            self.compile_arm_body(arm_column)?;
        }
        self.emit(&[bytecode::BC_CASE_DONE])?;
        for (group, &(pos, arm_column)) in arms.bodies.iter().enumerate() {
            self.place_label(frame, group + 1);
            self.cursor.reset(pos);
            self.compile_arm_body(arm_column)?;
            self.emit(&[bytecode::BC_CASE_DONE])?;
        }

        self.cursor.reset(arms.end);
        self.place_label(frame, END);
        self.close_frame();
        Ok(())
    }

    fn compile_case_fast(&mut self, column: u32) -> Result<()> {
        let keyword = self.cursor.advance();
        let frame = self.open_frame(FrameKind::CaseFast, keyword.span)?;
        self.emit_address(frame, END)?;
        self.emit_expression()?;
        self.expect_end()?;

        // First structural pass: collect the values of every match line.
        let mut entries: Vec<(i32, i32, usize, Span)> = Vec::new();
        let arms = self.scan_case_arms(column, keyword.span, |c, group| {
            loop {
                let (lo, span) = c.case_fast_value()?;
                let hi = if c.cursor.peek_kind() == TokenKind::DotDot {
                    c.cursor.advance();
                    c.case_fast_value()?.0
                } else {
                    lo
                };
                entries.push((lo.min(hi), lo.max(hi), group, span));
                if c.cursor.peek_kind() != TokenKind::Comma {
                    return Ok(());
                }
                c.cursor.advance();
            }
        })?;

        let (Some(min), Some(max)) = (
            entries.iter().map(|e| e.0).min(),
            entries.iter().map(|e| e.1).max(),
        ) else {
            return Err(CompileError::syntax(
                "SPN-S014",
                keyword.span,
                "CASE_FAST needs at least one match value",
            ));
        };
        let spread = max as i64 - min as i64;
        if spread > self.config.case_fast_span_limit as i64 || spread >= u16::MAX as i64 {
            return Err(CompileError::limit(
                "SPN-K003",
                keyword.span,
                format!(
                    "CASE_FAST values span {spread}, more than {}",
                    self.config.case_fast_span_limit
                ),
            ));
        }
        let count = spread as usize + 1;
        let mut table: Vec<Option<usize>> = vec![None; count];
        for &(lo, hi, group, span) in &entries {
            for value in lo..=hi {
                let slot = &mut table[(value as i64 - min as i64) as usize];
                if slot.is_some() {
                    return Err(CompileError::syntax(
                        "SPN-S010",
                        span,
                        format!("CASE_FAST value {value} is matched more than once"),
                    ));
                }
                *slot = Some(group);
            }
        }
        trace!(min, max, count, "case_fast table");

        self.emit(&[bytecode::BC_CASE_FAST_INIT])?;
        self.emit(&(min as u32).to_le_bytes())?;
        self.emit(&(count as u16).to_le_bytes())?;
        let table_base = self.image.offset();
        self.emit(&vec![0u8; 2 * (count + 1)])?;

        if let Some(frame) = self.frame_mut(frame) {
            frame.stack_bytes = CASE_BYTES;
        }
        // Second structural pass: the blocks, then their offsets into the table.
        let mut blocks = Vec::with_capacity(arms.bodies.len());
        for &(pos, arm_column) in &arms.bodies {
            blocks.push(self.image.offset());
            self.cursor.reset(pos);
            self.compile_arm_body(arm_column)?;
            self.emit(&[bytecode::BC_CASE_FAST_DONE])?;
        }
        let other = self.image.offset();
        if let Some((pos, arm_column)) = arms.other {
            self.cursor.reset(pos);
            self.compile_arm_body(arm_column)?;
        }
        self.emit(&[bytecode::BC_CASE_FAST_DONE])?;

        for (index, group) in table.iter().enumerate() {
            let target = group.and_then(|g| blocks.get(g).copied()).unwrap_or(other);
            self.patch_table_entry(table_base, index, target, keyword.span)?;
        }
        self.patch_table_entry(table_base, count, other, keyword.span)?;

        self.cursor.reset(arms.end);
        self.place_label(frame, END);
        self.close_frame();
        Ok(())
    }

    fn case_fast_value(&mut self) -> Result<(i32, Span)> {
        let span = self.cursor.span();
        match self.resolve_constant()? {
            Some(constant) if !constant.float => Ok((constant.value as i32, span)),
            _ => Err(CompileError::syntax(
                "SPN-S009",
                span,
                "CASE_FAST match values must be integer constants",
            )),
        }
    }

    fn patch_table_entry(&mut self, base: usize, index: usize, target: usize, span: Span) -> Result<()> {
        let offset = target - base;
        let limit = self.config.case_fast_table_limit.min(u16::MAX as u32) as usize;
        if offset > limit {
            return Err(CompileError::limit(
                "SPN-K004",
                span,
                format!("CASE_FAST blocks exceed {limit} bytes"),
            ));
        }
        self.image
            .replace_word(base + 2 * index, offset as u16)
            .map_err(|e| CompileError::from_image(e, span))
    }

    /// Walk the match lines of a CASE body. `values` consumes one line's value list
    /// (everything before the colon) for match group `group`; bodies are only located.
    fn scan_case_arms<F>(&mut self, column: u32, span: Span, mut values: F) -> Result<CaseArms>
    where
        F: FnMut(&mut Self, usize) -> Result<()>,
    {
        let mut arms = CaseArms::default();
        loop {
            while self.cursor.peek_kind() == TokenKind::End {
                self.cursor.advance();
            }
            let token = self.cursor.peek();
            if token.kind == TokenKind::EndFile || token.column <= column {
                break;
            }
            let arm_column = token.column;
            if token.kind == TokenKind::Other {
                if arms.other.is_some() {
                    return Err(CompileError::syntax("SPN-S006", token.span, "OTHER is already used"));
                }
                self.cursor.advance();
                self.expect(TokenKind::Colon)?;
                arms.other = Some((self.cursor.mark(), arm_column));
            } else {
                if arms.other.is_some() {
                    return Err(CompileError::syntax(
                        "SPN-S007",
                        token.span,
                        "OTHER must be the last case",
                    ));
                }
                let group = arms.bodies.len();
                if group >= self.config.case_limit {
                    return Err(CompileError::limit(
                        "SPN-K001",
                        token.span,
                        format!("CASE has more than {} match lines", self.config.case_limit),
                    ));
                }
                values(self, group)?;
                self.expect(TokenKind::Colon)?;
                arms.bodies.push((self.cursor.mark(), arm_column));
            }
            self.skip_line();
            self.skip_deeper(arm_column);
        }
        if arms.bodies.is_empty() && arms.other.is_none() {
            return Err(CompileError::syntax("SPN-S014", span, "CASE block has no cases"));
        }
        arms.end = self.cursor.mark();
        Ok(arms)
    }

    /// The statement after a match line's colon (if any) and the lines nested under it.
    fn compile_arm_body(&mut self, column: u32) -> Result<()> {
        if self.cursor.peek().is_line_end() {
            self.expect_end()?;
        } else {
            self.compile_statement(column)?;
        }
        self.compile_lines(Some(column))
    }

    // ── REPEAT, NEXT, QUIT ───────────────────────────────────────────

    fn compile_repeat(&mut self, column: u32) -> Result<()> {
        let keyword = self.cursor.advance();
        let frame = self.open_frame(FrameKind::Repeat, keyword.span)?;
        match self.cursor.peek_kind() {
            TokenKind::End | TokenKind::EndFile => self.compile_repeat_plain(frame, column)?,
            TokenKind::While | TokenKind::Until => self.compile_repeat_pre_test(frame, column)?,
            TokenKind::Local | TokenKind::Var if self.second_kind() == TokenKind::From => {
                self.compile_repeat_from(frame, column)?
            }
            _ => self.compile_repeat_count(frame, column)?,
        }
        self.close_frame();
        Ok(())
    }

    /// `REPEAT` alone: forever, or post-tested when an aligned WHILE/UNTIL closes it.
    fn compile_repeat_plain(&mut self, frame: FrameId, column: u32) -> Result<()> {
        self.expect_end()?;
        let post_test = self.post_test_follows(column);
        self.place_label(frame, LOOP);
        if !post_test {
            self.place_label(frame, NEXT);
        }
        self.compile_lines(Some(column))?;
        if post_test {
            self.place_label(frame, NEXT);
            let keyword = self.cursor.advance();
            self.emit_expression()?;
            self.expect_end()?;
            let back = if keyword.kind == TokenKind::While {
                bytecode::BC_JNZ
            } else {
                bytecode::BC_JZ
            };
            self.emit_branch(&[back], frame, LOOP)?;
        } else {
            self.emit_branch(&[bytecode::BC_JMP], frame, LOOP)?;
        }
        self.place_label(frame, QUIT);
        Ok(())
    }

    fn compile_repeat_pre_test(&mut self, frame: FrameId, column: u32) -> Result<()> {
        let keyword = self.cursor.advance();
        self.place_label(frame, LOOP);
        self.place_label(frame, NEXT);
        self.emit_expression()?;
        self.expect_end()?;
        let exit = if keyword.kind == TokenKind::While {
            bytecode::BC_JZ
        } else {
            bytecode::BC_JNZ
        };
        self.emit_branch(&[exit], frame, QUIT)?;
        self.compile_lines(Some(column))?;
        self.emit_branch(&[bytecode::BC_JMP], frame, LOOP)?;
        self.place_label(frame, QUIT);
        Ok(())
    }

    fn compile_repeat_count(&mut self, frame: FrameId, column: u32) -> Result<()> {
        if self.line_contains(&TokenKind::With) {
            if let Some(f) = self.frame_mut(frame) {
                f.quit_bytes = VAR_LOOP_BYTES;
            }
            self.emit_address(frame, QUIT)?;
            self.emit_expression()?;
            self.expect(TokenKind::With)?;
            let (kind, offset) = self.expect_variable()?;
            self.expect_end()?;
            self.emit_variable(kind, offset, bytecode::VAR_REPEAT_INIT_N)?;
            return self.compile_var_loop_body(frame, column, kind, offset);
        }

        if let Some(f) = self.frame_mut(frame) {
            f.quit_bytes = COUNT_LOOP_BYTES;
        }
        self.emit_expression()?;
        self.expect_end()?;
        self.emit_branch(&[bytecode::BC_TJZ], frame, QUIT)?;
        self.place_label(frame, LOOP);
        self.compile_lines(Some(column))?;
        self.place_label(frame, NEXT);
        self.emit_branch(&[bytecode::BC_DJNZ], frame, LOOP)?;
        self.place_label(frame, QUIT);
        Ok(())
    }

    fn compile_repeat_from(&mut self, frame: FrameId, column: u32) -> Result<()> {
        let (kind, offset) = self.expect_variable()?;
        self.expect(TokenKind::From)?;
        if let Some(f) = self.frame_mut(frame) {
            f.quit_bytes = VAR_LOOP_BYTES;
        }
        self.emit_address(frame, QUIT)?;
        self.emit_expression()?;
        self.expect(TokenKind::To)?;
        self.emit_expression()?;
        let init = if self.cursor.peek_kind() == TokenKind::Step {
            self.cursor.advance();
            self.emit_expression()?;
            bytecode::VAR_REPEAT_INIT
        } else {
            bytecode::VAR_REPEAT_INIT_1
        };
        self.expect_end()?;
        self.emit_variable(kind, offset, init)?;
        self.compile_var_loop_body(frame, column, kind, offset)
    }

    fn compile_var_loop_body(&mut self, frame: FrameId, column: u32, kind: VarKind, offset: u32) -> Result<()> {
        self.place_label(frame, LOOP);
        self.compile_lines(Some(column))?;
        self.place_label(frame, NEXT);
        let step = bytecode::variable_bytes(kind, offset, bytecode::VAR_REPEAT_LOOP);
        self.emit_branch(&step, frame, LOOP)?;
        self.place_label(frame, QUIT);
        Ok(())
    }

    fn compile_next_quit(&mut self) -> Result<()> {
        let keyword = self.cursor.advance();
        let quit = keyword.kind == TokenKind::Quit;
        let mut pop = 0;
        let mut target = None;
        for &id in self.blocks.open.iter().rev() {
            let Some(frame) = self.blocks.frames.get(id) else { continue };
            if frame.kind == FrameKind::Repeat {
                if quit {
                    pop += frame.quit_bytes;
                }
                target = Some(id);
                break;
            }
            pop += frame.stack_bytes;
        }
        let Some(frame) = target else {
            return Err(CompileError::syntax(
                "SPN-S008",
                keyword.span,
                format!("{} is not inside a REPEAT block", keyword.kind.describe()),
            ));
        };
        if pop > 0 {
            let mut bytes = vec![bytecode::BC_POP_RFVAR];
            bytes.extend(varint::encode_rfvar(pop));
            self.emit(&bytes)?;
        }
        self.emit_branch(&[bytecode::BC_JMP], frame, if quit { QUIT } else { NEXT })?;
        self.expect_end()
    }

    // ── LOOKUP / LOOKDOWN ────────────────────────────────────────────

    pub(super) fn compile_lookup(&mut self, kind: LookKind, span: Span) -> Result<()> {
        let frame = self.open_frame(FrameKind::Look, span)?;
        self.expect(TokenKind::LeftParen)?;
        self.emit_address(frame, END)?;
        self.emit_constant(kind.base())?;
        self.emit_expression()?;
        self.expect(TokenKind::Colon)?;

        let (value_op, range_op) = if kind.is_lookdown() {
            (bytecode::BC_LOOKDOWN_VALUE, bytecode::BC_LOOKDOWN_RANGE)
        } else {
            (bytecode::BC_LOOKUP_VALUE, bytecode::BC_LOOKUP_RANGE)
        };
        loop {
            self.emit_expression()?;
            if self.cursor.peek_kind() == TokenKind::DotDot {
                self.cursor.advance();
                self.emit_expression()?;
                self.emit(&[range_op])?;
            } else {
                self.emit(&[value_op])?;
            }
            if self.cursor.peek_kind() != TokenKind::Comma {
                break;
            }
            self.cursor.advance();
        }
        self.expect(TokenKind::RightParen)?;
        self.emit(&[bytecode::BC_LOOK_DONE])?;

        self.place_label(frame, END);
        self.close_frame();
        Ok(())
    }

    // ── Token scanning ───────────────────────────────────────────────

    fn second_kind(&mut self) -> TokenKind {
        let mark = self.cursor.mark();
        self.cursor.advance();
        let kind = self.cursor.peek_kind();
        self.cursor.reset(mark);
        kind
    }

    fn line_contains(&mut self, kind: &TokenKind) -> bool {
        let mark = self.cursor.mark();
        let mut found = false;
        loop {
            let token = self.cursor.advance();
            if token.is_line_end() {
                break;
            }
            if &token.kind == kind {
                found = true;
                break;
            }
        }
        self.cursor.reset(mark);
        found
    }

    /// Whether the lines after a bare REPEAT end in a WHILE/UNTIL at its column.
    fn post_test_follows(&mut self, column: u32) -> bool {
        let mark = self.cursor.mark();
        self.skip_deeper(column);
        let token = self.cursor.peek();
        self.cursor.reset(mark);
        matches!(token.kind, TokenKind::While | TokenKind::Until) && token.column == column
    }

    /// Skip to just past the current line's `End`.
    fn skip_line(&mut self) {
        loop {
            match self.cursor.peek_kind() {
                TokenKind::EndFile => return,
                TokenKind::End => {
                    self.cursor.advance();
                    return;
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Skip every following line indented deeper than `column`.
    fn skip_deeper(&mut self, column: u32) {
        loop {
            let token = self.cursor.peek();
            match token.kind {
                TokenKind::EndFile => return,
                TokenKind::End => {
                    self.cursor.advance();
                }
                _ if token.column > column => self.skip_line(),
                _ => return,
            }
        }
    }
}
