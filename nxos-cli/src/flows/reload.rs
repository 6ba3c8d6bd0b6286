//! Answers for the questions a reload and the following boot ask.

use crate::channel::{ActionMap, SecretRef};
use crate::error::Result;

/// Ordered reactions for `reload` through first login.
///
/// Specific prompts come first; the generic yes/no catch-alls at the end
/// only fire when nothing more specific matched on the line.
pub fn reload_action_map() -> Result<ActionMap> {
    Ok(ActionMap::new()
        .send_line(
            r"[Aa]bort\s+[Pp]ower\s+[Oo]n\s+[Aa]uto\s+[Pp]rovisioning.*[\(\[].*[Nn]o[\]\)]",
            "yes",
        )?
        .send_line(
            r"[Ee]nter\s+system\s+maintenance\s+mode.*[\[\(][Yy](es)?/[Nn](o)?[\)\]]",
            "n",
        )?
        .send_line(r"[Ss]tandby card not present or not [Rr]eady for failover", "y")?
        .send_line(r"[Pp]roceed with reload", " ")?
        .send_line(r"reboot.*system", "y")?
        .send_line(r"[Ww]ould you like to enter the basic configuration dialog", "n")?
        .send_line(r"[Dd]o you want to enforce secure password standard", "n")?
        .send_line(r"(?:[Ll]ogin|[Uu]ser|[Uu]sername):\s*$", "admin")?
        .send_secret(r"[Pp]assword[^\n]*:\s*$", SecretRef::Password)?
        .send_line(r"\[confirm\]", "y")?
        .send_line(r"continue", "y")?
        .send_line(r"\(y/n\)", "n")?
        .send_line(r"[\[\(][Yy]es/[Nn]o[\)\]]", "n")?
        .send_line(r"[\[\(][Nn]o[\)\]]", "n")?
        .send_line(r"[\[\(][Yy]es[\)\]]", "n")?
        .send_line(r"[\[\(][Yy]/[Nn][\)\]]", "n")?)
}
