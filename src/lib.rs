//! An interpreter for the CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * one explicit [`machine::Machine`] value owns all the mutable state:
//!   register file, index register, program counter, call stack, timers,
//!   key latch, framebuffer, RNG and the 4K address space
//! * the engine in [`interpreter`] runs the per-cycle contract: fetch two
//!   bytes at PC, step PC, decode via [`opcode::Instruction`], execute,
//!   then tick both timers. Anything undecodable ends the run
//! * display, input and audio hang off trait seams so alternatives (and
//!   test dummies) plug in without touching the engine
//! * audio is fire-and-forget: a sound-timer edge posts one beep on a
//!   worker thread's queue and the interpreter never waits for it
//! * presentation cadence belongs to the main loop, not the machine: the
//!   framebuffer is repainted only when the draw flag says it changed,
//!   every `frame_after` cycles, with a sleep after each repaint to pace
//!   execution

pub mod display;
pub mod input;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod opcode;
pub mod rng;
pub mod sound;
