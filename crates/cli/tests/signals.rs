#![forbid(unsafe_code)]

#[cfg(unix)]
mod unix {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::fs;
    use std::io;
    use std::path::Path;
    use std::process::{Child, Command, Output, Stdio};
    use std::thread::sleep;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[test]
    fn signals_dump_reload_and_clear() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path, 1)?;

        let child = Command::new(env!("CARGO_BIN_EXE_appwatch"))
            .arg("--conffile")
            .arg(&config_path)
            .arg("--in-memory")
            .arg("-v")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let pid = Pid::from_raw(child.id() as i32);
        sleep(Duration::from_millis(500));

        kill(pid, Signal::SIGUSR1).ok();
        sleep(Duration::from_millis(400));

        write_config(&config_path, 3)?;
        kill(pid, Signal::SIGHUP).ok();
        sleep(Duration::from_millis(400));

        kill(pid, Signal::SIGUSR1).ok();
        sleep(Duration::from_millis(400));

        kill(pid, Signal::SIGUSR2).ok();
        sleep(Duration::from_millis(500));

        kill(pid, Signal::SIGINT).ok();
        let output = wait_for_output(child)?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        assert!(output.status.success(), "appwatch failed:\n{combined}");
        assert!(combined.matches("current config").count() >= 2);
        assert!(combined.contains("config reloaded"));
        assert!(combined.contains("history cleared"));
        assert!(combined.contains("in-memory state cleared"));
        assert!(combined.contains("shutdown requested"));

        Ok(())
    }

    #[test]
    fn database_is_created_on_disk() -> io::Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.toml");
        write_config(&config_path, 1)?;
        let database = dir.path().join("state").join("usage.db");

        let child = Command::new(env!("CARGO_BIN_EXE_appwatch"))
            .arg("-c")
            .arg(&config_path)
            .arg("-d")
            .arg(&database)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let pid = Pid::from_raw(child.id() as i32);
        sleep(Duration::from_millis(500));
        kill(pid, Signal::SIGTERM).ok();
        let output = wait_for_output(child)?;

        assert!(output.status.success());
        assert!(database.exists());

        Ok(())
    }

    fn write_config(path: &Path, interval: u64) -> io::Result<()> {
        let contents = format!(
            "[monitor]\ninterval = {interval}\nreconcile_on_start = true\n\n\
[filter]\nrequire_display = true\n\n\
[persistence]\ndatabase = \"\"\n"
        );
        fs::write(path, contents)
    }

    fn wait_for_output(mut child: Child) -> io::Result<Output> {
        let start = Instant::now();
        loop {
            if child.try_wait()?.is_some() {
                break;
            }
            if start.elapsed() > Duration::from_secs(10) {
                let _ = child.kill();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "appwatch did not exit",
                ));
            }
            sleep(Duration::from_millis(50));
        }
        child.wait_with_output()
    }
}

#[cfg(not(unix))]
#[test]
fn signals_dump_reload_and_clear() {
    // Signals are only supported in the Unix build.
}
