use crate::e2e::*;

#[test]
fn statuses_on_stderr() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let args = with_flags(&["--timeout-ms", "100"], SLEEP_1);
    let out = space.run_expect(&mut procrun_command(args))?;
    assert_stderr_contains(&out, "status: Ok");
    assert_stderr_contains(&out, "status: Timeout (timeout)");
    Ok(())
}

#[test]
fn workdir() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("marker", "")?;
    let dir = space.path().to_str().unwrap().to_string();

    // Run from elsewhere, pointing the child at the space.
    let args = with_flags(&["--workdir", &dir], HAS_MARKER);
    let out = procrun_command(args).output()?;
    assert_output_contains(&out, "exit code: 0");

    let out = procrun_command(HAS_MARKER.to_vec()).output()?;
    assert_output_contains(&out, "exit code: 1");
    Ok(())
}

#[test]
fn detach() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run_expect(&mut procrun_command(with_flags(&["--detach"], ECHO_HELLO)))?;
    assert_output_contains(&out, "spawned, pid=");
    Ok(())
}

#[test]
fn debug_trace() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.run_expect(&mut procrun_command(with_flags(&["-d", "trace"], ECHO_HELLO)))?;
    let trace = String::from_utf8(space.read("trace.json")?)?;
    assert!(trace.contains("\"name\": \"spawn\""));
    assert!(trace.contains("\"name\": \"exit_code\""));
    assert!(trace.contains("\"status\": \"Ok\""));
    Ok(())
}

#[test]
fn debug_unknown() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut procrun_command(vec!["-d", "bogus"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_output_contains(&out, "unknown -d \"bogus\"");
    Ok(())
}
