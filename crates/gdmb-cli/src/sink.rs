use gdmb_refs::BranchRef;
use gdmb_sdk::{DeletionSink, SdkResult};

/// The git commands a deletion corresponds to.
pub fn git_commands(branches: &[BranchRef], remote: Option<&str>, force: bool) -> String {
    match remote {
        None => {
            let mut argv = vec!["git", "branch", "--delete"];
            if force {
                argv.push("--force");
            }
            argv.extend(branches.iter().map(|b| b.name.as_str()));
            argv.join(" ")
        }
        Some(remote) => {
            let mut command = format!("git push --delete --force-with-lease {remote}");
            for branch in branches {
                command.push_str(" refs/heads/");
                command.push_str(&branch.name);
            }
            command
        }
    }
}

/// Prints the git commands instead of deleting anything.
#[derive(Default)]
pub struct EchoSink {
    pub commands: Vec<String>,
}

impl EchoSink {
    fn echo(&mut self, command: String) {
        println!("$ {command}");
        self.commands.push(command);
    }
}

impl DeletionSink for EchoSink {
    fn delete_local(&mut self, branches: &[BranchRef], force: bool) -> SdkResult<()> {
        self.echo(git_commands(branches, None, force));
        Ok(())
    }

    fn delete_remote(&mut self, remote: &str, branches: &[BranchRef]) -> SdkResult<()> {
        self.echo(git_commands(branches, Some(remote), true));
        Ok(())
    }
}
