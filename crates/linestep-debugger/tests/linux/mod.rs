mod utils;

use std::collections::HashSet;
use std::convert::Infallible;
use std::path::{Path, PathBuf};

use linestep_debugger::{
    Breakpoint, Debugger, EventHandler, ExitStatus, LineEntry, LinuxController, ModuleRegistry,
    Module, ProcessControl, StepReport, StopKind, TRAP_OPCODE, TraceeMemory, WaitTarget,
};
use linestep_symbol::LinkageType;
use nix::sys::signal::Signal;
use test_log::test;

/// Records the source lines stepped within the debugged program.
#[derive(Default)]
struct TestStepHandler {
    main_linkage: Option<LinkageType>,
    entry: Option<LineEntry>,
    lines: Vec<(u64, u32)>,
    stepped_threads: HashSet<u64>,
    exited_threads: Vec<u64>,
}

impl EventHandler for TestStepHandler {
    type Error = Infallible;

    async fn modules_loaded(
        &mut self,
        registry: &ModuleRegistry,
        main_module: &Module,
    ) -> Result<(), Self::Error> {
        assert!(registry.len() > 1);
        assert!(main_module.has_debug_info());
        self.main_linkage = Some(main_module.linkage());
        Ok(())
    }

    async fn entry_reached(
        &mut self,
        _thread_id: u64,
        function: &str,
        entry: &LineEntry,
    ) -> Result<(), Self::Error> {
        assert_eq!(function, "main");
        self.entry = Some(entry.clone());
        Ok(())
    }

    async fn line_stepped(&mut self, report: &StepReport<'_>) -> Result<(), Self::Error> {
        self.stepped_threads.insert(report.thread_id);

        if let Ok(entry) = &report.result {
            if entry.file.ends_with(".c") && self.lines.last() != Some(&(report.thread_id, entry.line)) {
                self.lines.push((report.thread_id, entry.line));
            }
        }

        Ok(())
    }

    async fn thread_exited(&mut self, thread_id: u64, _status: ExitStatus) -> Result<(), Self::Error> {
        self.exited_threads.push(thread_id);
        Ok(())
    }
}

fn fixture(name: &str) -> PathBuf {
    Path::new("tests/linux").join(name)
}

#[test(tokio::test)]
async fn breakpoint_round_trip() {
    let tracee_path = utils::compile_tracee(&fixture("calls.c"), true);
    let program = tracee_path.canonicalize().unwrap();

    let debuggee = linestep_debugger::spawn_debuggee(&program, ["unused"]).expect("spawn");
    let mut controller = LinuxController::new(debuggee);
    let pid = controller.process_id();

    let event = controller
        .wait_for_stop(WaitTarget::Thread(pid))
        .expect("wait")
        .expect("stopped debuggee");
    assert!(matches!(event.kind, StopKind::Stopped(e) if e.is_trap()));

    let registry = controller.load_modules(pid).await.expect("modules");
    let main_module = registry.find_by_path(&program).expect("main module");
    assert_eq!(main_module.linkage(), LinkageType::PositionIndependent);

    let entry = linestep_debugger::resolve_function_entry(main_module, "main").expect("main");
    let addr = main_module.to_absolute(entry.address);

    let original = controller.read_word(pid, addr).expect("read");

    let mut bk = Breakpoint::install(&mut controller, pid, addr).expect("install");

    let patched = controller.read_word(pid, addr).expect("read");
    assert_eq!(patched as u8, TRAP_OPCODE);
    assert_eq!(patched >> 8, original >> 8);

    bk.remove(&mut controller).expect("remove");
    assert_eq!(controller.read_word(pid, addr).expect("read"), original);

    drop(controller);
    drop(tracee_path);
}

#[test(tokio::test)]
async fn reaped_debuggee_is_not_signaled() {
    let tracee_path = utils::compile_tracee(&fixture("calls.c"), false);
    let program = tracee_path.canonicalize().unwrap();

    let debuggee = linestep_debugger::spawn_debuggee(&program, ["unused"]).expect("spawn");
    let mut controller = LinuxController::new(debuggee);
    let pid = controller.process_id();

    let event = controller
        .wait_for_stop(WaitTarget::Thread(pid))
        .expect("wait")
        .expect("stopped debuggee");
    assert!(matches!(event.kind, StopKind::Stopped(e) if e.is_trap()));

    assert!(controller.debuggee().kill().expect("kill"));

    let event = controller
        .wait_for_stop(WaitTarget::Thread(pid))
        .expect("wait")
        .expect("killed debuggee");
    assert_eq!(event.thread_id, pid);
    assert!(matches!(event.kind, StopKind::Killed(e) if e.0 == Signal::SIGKILL));

    // reaped: the pidfd no longer designates a live process
    assert!(!controller.debuggee().kill().expect("kill"));
    assert!(controller.wait_for_stop(WaitTarget::Any).expect("wait").is_none());

    drop(controller);
    drop(tracee_path);
}

#[test(tokio::test)]
async fn three_functions_nopie() {
    test_three_functions(false).await;
}

#[test(tokio::test)]
async fn three_functions_pie() {
    test_three_functions(true).await;
}

async fn test_three_functions(is_pie: bool) {
    let tracee_path = utils::compile_tracee(&fixture("calls.c"), is_pie);

    let session = Debugger::spawn(&tracee_path, std::iter::empty::<&str>())
        .await
        .expect("spawn");
    let pid = session.process_id();

    let mut handler = TestStepHandler::default();
    let outcome = session.run(&mut handler).await.expect("run");

    assert_eq!(outcome.exit_status, Some(ExitStatus::ExitCode(0)));
    assert_eq!(
        handler.main_linkage,
        Some(if is_pie {
            LinkageType::PositionIndependent
        } else {
            LinkageType::Executable
        })
    );

    let entry = handler.entry.expect("entry reached");
    assert_eq!(entry.line, 22);
    assert!(entry.file.ends_with("calls.c"));

    // first occurrence of each function body, then of each call site
    let position = |line: u32| {
        handler
            .lines
            .iter()
            .position(|(thread_id, l)| *thread_id == pid && *l == line)
            .unwrap_or_else(|| panic!("line {line} never stepped: {:?}", handler.lines))
    };

    let (first, second, third) = (position(7), position(12), position(17));
    assert!(first < second && second < third);

    let (call_second, call_third) = (position(23), position(24));
    assert!(first < call_second && call_second < second);
    assert!(second < call_third && call_third < third);

    assert!(handler.exited_threads.contains(&pid));

    drop(tracee_path);
}

#[test(tokio::test)]
async fn multithreading_exit_in_any_order() {
    let tracee_path = utils::compile_tracee(&fixture("threads.c"), true);

    let session = Debugger::spawn(&tracee_path, std::iter::empty::<&str>())
        .await
        .expect("spawn");
    let pid = session.process_id();

    let mut handler = TestStepHandler::default();
    let outcome = session.run(&mut handler).await.expect("run");

    assert_eq!(outcome.exit_status, Some(ExitStatus::ExitCode(0)));

    // main thread plus its workers
    assert!(outcome.threads.len() >= 4, "threads: {:?}", outcome.threads);
    assert_eq!(outcome.threads.live_count(), 0);
    assert!(handler.stepped_threads.len() >= 4);

    // every stepped thread has exited, whatever the order
    for thread_id in &handler.stepped_threads {
        assert!(
            handler.exited_threads.contains(thread_id),
            "thread {thread_id} never exited"
        );
    }
    assert!(handler.exited_threads.contains(&pid));

    // worker body (`*value *= 2`) stepped by threads other than the main one
    assert!(
        handler
            .lines
            .iter()
            .any(|(thread_id, line)| *thread_id != pid && *line == 8)
    );

    drop(tracee_path);
}
