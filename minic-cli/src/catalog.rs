/// A built-in program selectable with `--example`.
pub struct Demo {
    pub name: &'static str,
    pub title: &'static str,
    pub source: &'static str,
}

pub const DEMOS: &[Demo] = &[
    Demo {
        name: "redeclaration",
        title: "Variable declared twice in one scope",
        source: r#"
int main() {
    int a = 5;
    int b = 10;
    int a = 20;
    return a + b;
}
"#,
    },
    Demo {
        name: "shadowing",
        title: "Local variable shadowing a global",
        source: r#"
int x = 20;

int main() {
    int x = 10;
    return x;
}
"#,
    },
    Demo {
        name: "loop-scope",
        title: "Loop body variable used after the loop",
        source: r#"
int main() {
    for (int i = 0; i < 5; i++) {
        int temp = i * 2;
    }
    temp = 10;
    return 0;
}
"#,
    },
    Demo {
        name: "function-scope",
        title: "Another function's local variable",
        source: r#"
int global_var = 5;

int func1() {
    int local_var = 10;
    return local_var;
}

int main() {
    local_var = 20;
    return 0;
}
"#,
    },
    Demo {
        name: "program",
        title: "A valid program with functions, arrays and I/O",
        source: r#"
#include <iostream>
using namespace std;

int add(int a, int b) {
    return a + b;
}

bool isEven(int n) {
    return n % 2 == 0;
}

int main() {
    int numbers[5] = {1, 2, 3, 4, 5};
    int sum = 0;
    for (int i = 0; i < 5; i++) {
        sum = add(sum, numbers[i]);
    }
    if (isEven(sum)) {
        cout << "even: " << sum << endl;
    } else {
        cout << "odd: " << sum << endl;
    }
    return 0;
}
"#,
    },
];

/// Look a demo up by name or by its 1-based position in the list.
pub fn find(key: &str) -> Option<&'static Demo> {
    if let Ok(n) = key.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| DEMOS.get(i));
    }
    DEMOS.iter().find(|d| d.name == key)
}
