use crate::e2e::*;

#[test]
fn no_command_prints_usage() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run_expect(&mut procrun_command(vec![]))?;
    assert_output_contains(&out, "examples:");
    Ok(())
}

#[test]
fn echo() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run_expect(&mut procrun_command(ECHO_HELLO.to_vec()))?;
    assert_output_contains(&out, "spawned, running=");
    assert_output_contains(&out, "hello");
    assert_output_contains(&out, "exit code: 0");
    Ok(())
}

#[test]
fn exit_code_propagates() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut procrun_command(EXIT_3.to_vec()))?;
    assert_output_contains(&out, "exit code: 3");
    assert_eq!(out.status.code(), Some(3));
    Ok(())
}

#[test]
fn timeout_then_wait() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let args = with_flags(&["--timeout-ms", "100"], SLEEP_1);
    let out = space.run_expect(&mut procrun_command(args))?;
    assert_output_contains(&out, "still running, waiting...");
    assert_output_contains(&out, "exit code: 0");
    Ok(())
}

#[test]
fn missing_program() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut procrun_command(vec!["--", "./no-such-program"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_output_contains(&out, "procrun: error: SysError");
    assert_stderr_contains(&out, "status: SysError");
    Ok(())
}
