//! Wait command generation

use super::commands::Command;

/// Split a duration into the shortest sequence of VGM wait commands
pub fn wait_commands(mut duration: u64) -> Vec<Command> {
    let mut commands = Vec::new();

    while duration > 0 {
        if (735..=751).contains(&duration)
            || duration == 1470
            || duration == 1617
            || (65536..=67152).contains(&duration)
        {
            commands.push(Command::Wait735);
            duration -= 735;
        } else if (882..=898).contains(&duration)
            || duration == 1764
            || (67153..=67299).contains(&duration)
        {
            commands.push(Command::Wait882);
            duration -= 882;
        } else if duration <= 16 {
            commands.push(Command::WaitNibble {
                count: duration as u8,
            });
            break;
        } else if duration <= 32 {
            commands.push(Command::WaitNibble { count: 16 });
            duration -= 16;
        } else if duration <= 65535 {
            commands.push(Command::Wait {
                samples: duration as u16,
            });
            break;
        } else {
            commands.push(Command::Wait { samples: 0xFFFF });
            duration -= 65535;
        }
    }

    commands
}
